mod launch;
mod process;
mod spawn;
