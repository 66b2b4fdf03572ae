pub mod files;
pub mod response;
