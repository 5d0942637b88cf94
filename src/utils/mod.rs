pub mod download;
pub mod progress_log;

#[cfg(test)]
pub mod test_server;
