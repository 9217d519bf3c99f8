pub mod error;
pub mod path;
pub mod wire;

pub use error::{AppError, AppResult, ErrorKind};
pub use path::Path;
