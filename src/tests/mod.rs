pub mod sync_scenarios;
