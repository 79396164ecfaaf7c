mod cache_dir;
mod config;
mod launcher;
mod marker;
mod startup;
mod watcher;
