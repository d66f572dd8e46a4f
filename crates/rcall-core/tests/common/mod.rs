pub mod status_server;
