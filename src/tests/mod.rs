mod support;

mod integration_measure_harness;
