pub mod runtime;

// Re-export the runtime functions so frontends can simply do:
pub use runtime::{
    generate_failure_report, load_topology, run_analysis_mode, run_fuzz_mode,
    run_simulation_mode, run_topology_mode, save_scenario, FuzzSummary, ScenarioSource,
    SimulationRequest,
};
