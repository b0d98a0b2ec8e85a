mod error;
mod lifecycle;
mod menu;
mod window;
