mod notify_watcher;
