mod flash;
mod handlers;
mod page;
mod state;
mod upload;

pub use handlers::{router, run_server};
pub use state::ServerState;
pub use upload::{ALLOWED_EXTENSIONS, allowed_file};
