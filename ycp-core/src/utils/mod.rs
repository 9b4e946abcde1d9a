pub mod log_file_name;
