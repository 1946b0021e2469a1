mod fanout_tests;
mod handshake_tests;
mod relay_tests;
