mod core_error;
mod spawn;
