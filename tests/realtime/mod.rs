mod scenario_tests;
mod socket_tests;
