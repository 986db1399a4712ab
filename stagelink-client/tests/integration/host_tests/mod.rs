pub mod test_capture_failure_aborts_join;
pub mod test_host_ends_stream;
pub mod test_host_offers_to_new_viewer;
