pub mod history;
pub mod init;
pub mod replay;
pub mod version;
