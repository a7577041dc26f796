pub mod logging;
pub mod port;
pub mod response;
