mod health_tests;
mod history_tests;
