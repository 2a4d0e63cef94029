pub mod extract;
pub mod init_config;
pub mod matching;
pub mod run;
