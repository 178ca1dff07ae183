mod dm_tests;
mod health_tests;
