mod config;
mod port;
mod supervisor;
