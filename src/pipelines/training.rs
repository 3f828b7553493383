//! `healthcare-training-pipeline`: preprocess, train and evaluate from a
//! dataset path

use crate::components::{evaluate, preprocess, train, BuiltinStep};
use crate::core::{
    ArtifactKind, GraphError, OutputRef, PipelineBuilder, PipelineGraph, Settings, Step, Task,
    IMPORTER_OUTPUT, IMPORTER_URI_INPUT,
};

pub const NAME: &str = "healthcare-training-pipeline";
pub const PACKAGE_PATH: &str = "healthcare_training_pipeline.yaml";

pub const DATA_PARAMETER: &str = "input_data_path";
pub const DEFAULT_DATA_PATH: &str = "/app/data/patients.csv";

pub fn build(settings: &Settings) -> Result<PipelineGraph, GraphError> {
    let mut builder = PipelineBuilder::new(NAME)
        .description("Preprocess patient data, train a cost regressor and evaluate it");
    let data_path = builder.parameter(DATA_PARAMETER, Some(DEFAULT_DATA_PATH))?;

    let import = builder.add_task(
        Task::new("import-patients", Step::importer(ArtifactKind::Dataset))
            .input(IMPORTER_URI_INPUT, data_path)
            .annotations(&settings.annotations),
    )?;

    add_training_chain(&mut builder, import.output(IMPORTER_OUTPUT)?, settings)?;
    builder.build()
}

/// Append `preprocess-data -> train-model -> evaluate-model` fed by `dataset`
pub(crate) fn add_training_chain(
    builder: &mut PipelineBuilder,
    dataset: OutputRef,
    settings: &Settings,
) -> Result<(), GraphError> {
    let preprocess_task = builder.add_task(
        Task::new("preprocess-data", BuiltinStep::PreprocessData.spec())
            .input(preprocess::INPUT, dataset)
            .annotations(&settings.annotations),
    )?;
    let processed = preprocess_task.output(preprocess::OUTPUT)?;

    let train_task = builder.add_task(
        Task::new("train-model", BuiltinStep::TrainModel.spec())
            .input(train::INPUT, processed.clone())
            .annotations(&settings.annotations),
    )?;

    builder.add_task(
        Task::new("evaluate-model", BuiltinStep::EvaluateModel.spec())
            .input(evaluate::MODEL_INPUT, train_task.output(train::OUTPUT)?)
            .input(evaluate::DATA_INPUT, processed)
            .annotations(&settings.annotations),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InputBinding;

    #[test]
    fn test_chain_wiring() {
        let graph = build(&Settings::default()).unwrap();
        assert_eq!(
            graph.execution_order(),
            vec!["import-patients", "preprocess-data", "train-model", "evaluate-model"]
        );

        let evaluate = graph.task("evaluate-model").unwrap();
        assert_eq!(evaluate.dependencies(), vec!["preprocess-data", "train-model"]);
        assert_eq!(
            evaluate.inputs.get("processed_data_path"),
            Some(&InputBinding::TaskOutput {
                task: "preprocess-data".into(),
                output: "processed_data_path".into()
            })
        );
    }

    #[test]
    fn test_annotations_on_every_task() {
        let settings = Settings::default();
        let graph = build(&settings).unwrap();
        for task in graph.tasks() {
            assert_eq!(task.annotations, settings.annotations, "task {}", task.id);
        }
        assert_eq!(
            settings.annotations.get("prometheus.io/scrape").map(String::as_str),
            Some("true")
        );
    }
}
