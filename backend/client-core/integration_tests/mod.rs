mod connection;
mod error;
mod helpers;
mod launcher;
mod startup;
mod watcher;
