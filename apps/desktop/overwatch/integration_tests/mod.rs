mod lifecycle;
mod state;
