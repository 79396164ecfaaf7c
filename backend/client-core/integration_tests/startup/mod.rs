mod coordinator;
mod end_to_end;
