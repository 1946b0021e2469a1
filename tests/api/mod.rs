mod health_tests;
mod message_tests;
