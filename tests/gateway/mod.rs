mod dm_tests;
mod presence_tests;
mod room_tests;
mod session_tests;
