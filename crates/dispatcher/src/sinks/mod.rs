//! Destination implementations

mod http;
mod local_file;
mod null;

pub use http::HttpClientTarget;
pub use local_file::LocalFileTarget;
pub use null::NullTarget;
