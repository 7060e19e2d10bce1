pub use app::App;

mod app;
mod pages;
