pub mod web_stream;
