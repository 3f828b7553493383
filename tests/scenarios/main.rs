//! Scenario-based tests for healthflow: whole pipelines run on the local
//! machine against small CSV fixtures

mod helpers;

mod definition_run;
mod failure_handling;
mod gcs_download;
mod healthcare_scoring;
mod training_chain;
