pub mod retry_utils;
