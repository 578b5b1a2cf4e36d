use std::path::{Path, PathBuf};

use pcd_parser::parsers::{extension_of, read_point_cloud};
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};
use serde::Serialize;

use crate::{
    error::ScorchError,
    model::ScorchModel,
    predictor::{ScorchPrediction, ScorchPredictor},
};

/// What to do when one file of a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Stop and return the error of the first failing file.
    #[default]
    AbortOnError,
    /// Record the failure and carry on with the remaining files.
    KeepGoing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    pub file: String,
    pub predicted_scorch: Option<f64>,
    pub error: Option<String>,
}

/// Point cloud files directly inside `dir`, sorted by file name.
pub fn list_point_cloud_files(dir: &Path) -> Result<Vec<PathBuf>, ScorchError> {
    let io_error = |source: std::io::Error| ScorchError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && extension_of(&path).is_ok() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn plot_path(plot_dir: Option<&Path>, file: &Path) -> Option<PathBuf> {
    let stem = file.file_stem()?.to_string_lossy();
    plot_dir.map(|dir| dir.join(format!("{stem}_histogram.png")))
}

fn predict_file(
    file: &Path,
    predictor: &ScorchPredictor,
    model: &dyn ScorchModel,
    plot_dir: Option<&Path>,
) -> Result<ScorchPrediction, ScorchError> {
    let start = std::time::Instant::now();
    let point_cloud = read_point_cloud(file)?;
    log::info!("{:?}: {} points", file, point_cloud.len());

    let plot = plot_path(plot_dir, file);
    let prediction = predictor.predict(point_cloud, model, plot.as_deref())?;
    log::info!(
        "{:?}: predicted scorch {:.4} in {:?}",
        file,
        prediction.predicted_scorch,
        start.elapsed()
    );
    Ok(prediction)
}

fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

/// Predicts every file in `files`, in parallel, sharing one model.
///
/// Records come back in the order of `files`. With
/// [`BatchPolicy::AbortOnError`] no new file is started once one has failed,
/// and the error of a failing file is returned. Which one is unspecified
/// when several fail concurrently.
pub fn predict_files(
    files: &[PathBuf],
    predictor: &ScorchPredictor,
    model: &dyn ScorchModel,
    plot_dir: Option<&Path>,
    policy: BatchPolicy,
) -> Result<Vec<BatchRecord>, ScorchError> {
    match policy {
        BatchPolicy::AbortOnError => files
            .par_iter()
            .map(|file| -> Result<BatchRecord, ScorchError> {
                let prediction = predict_file(file, predictor, model, plot_dir)?;
                Ok(BatchRecord {
                    file: file_name(file),
                    predicted_scorch: Some(prediction.predicted_scorch),
                    error: None,
                })
            })
            .collect(),
        BatchPolicy::KeepGoing => Ok(files
            .par_iter()
            .map(|file| match predict_file(file, predictor, model, plot_dir) {
                Ok(prediction) => BatchRecord {
                    file: file_name(file),
                    predicted_scorch: Some(prediction.predicted_scorch),
                    error: None,
                },
                Err(e) => {
                    log::warn!("{:?}: {}", file, e);
                    BatchRecord {
                        file: file_name(file),
                        predicted_scorch: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()),
    }
}

/// Predicts every point cloud file in `dir`.
pub fn predict_directory(
    dir: &Path,
    predictor: &ScorchPredictor,
    model: &dyn ScorchModel,
    plot_dir: Option<&Path>,
    policy: BatchPolicy,
) -> Result<Vec<BatchRecord>, ScorchError> {
    let files = list_point_cloud_files(dir)?;
    log::info!("{} point cloud files in {:?}", files.len(), dir);
    predict_files(&files, predictor, model, plot_dir, policy)
}

#[cfg(test)]
mod tests {
    use std::{
        fmt::Write as _,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{config::ScorchConfig, features::FeatureVector};

    struct ConstantModel(Vec<String>);

    impl ScorchModel for ConstantModel {
        fn feature_names(&self) -> &[String] {
            &self.0
        }

        fn predict(&self, _: &FeatureVector) -> Result<f64, ScorchError> {
            Ok(0.25)
        }
    }

    fn crown_csv(reflectance: f64) -> String {
        let mut csv = String::from("x,y,z,reflectance\n");
        for i in 0..50 {
            let (x, z) = (i as f64 * 0.1, 3.0 + i as f64 * 0.01);
            writeln!(csv, "{x},0,{z},{reflectance}").unwrap();
        }
        csv
    }

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_tree.csv"), crown_csv(-8.0)).unwrap();
        std::fs::write(dir.path().join("a_tree.csv"), crown_csv(-12.0)).unwrap();
        std::fs::write(dir.path().join("notes.md"), "not a point cloud").unwrap();
        dir
    }

    fn predictor() -> ScorchPredictor {
        ScorchPredictor::new(ScorchConfig::default())
            .unwrap()
            .assume_crown_only(true)
    }

    #[test]
    fn files_are_listed_in_name_order() {
        let dir = setup();
        let files = list_point_cloud_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_tree.csv", "b_tree.csv"]);
    }

    #[test]
    fn directory_predictions_pair_file_and_scorch() {
        let dir = setup();
        let model = ConstantModel(vec![]);
        let records = predict_directory(
            dir.path(),
            &predictor(),
            &model,
            None,
            BatchPolicy::AbortOnError,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file, "a_tree.csv");
        assert_eq!(records[0].predicted_scorch, Some(0.25));
        assert_eq!(records[1].file, "b_tree.csv");
        assert!(records.iter().all(|r| r.error.is_none()));
    }

    #[test]
    fn bad_file_aborts_by_default() {
        let dir = setup();
        std::fs::write(dir.path().join("c_tree.csv"), "x,y\n1,2\n").unwrap();
        let model = ConstantModel(vec![]);

        let result = predict_directory(
            dir.path(),
            &predictor(),
            &model,
            None,
            BatchPolicy::AbortOnError,
        );
        assert!(matches!(result, Err(ScorchError::Parse(_))));
    }

    struct CountingModel(AtomicUsize);

    impl ScorchModel for CountingModel {
        fn feature_names(&self) -> &[String] {
            &[]
        }

        fn predict(&self, _: &FeatureVector) -> Result<f64, ScorchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(0.5)
        }
    }

    #[test]
    fn abort_stops_starting_new_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_broken.csv"), "x,y\n1,2\n").unwrap();
        for i in 0..8 {
            std::fs::write(dir.path().join(format!("t{i}.csv")), crown_csv(-8.0)).unwrap();
        }
        let files = list_point_cloud_files(dir.path()).unwrap();
        let model = CountingModel(AtomicUsize::new(0));

        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let result = pool.install(|| {
            predict_files(&files, &predictor(), &model, None, BatchPolicy::AbortOnError)
        });

        assert!(matches!(result, Err(ScorchError::Parse(_))));
        assert_eq!(model.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn keep_going_records_failures() {
        let dir = setup();
        std::fs::write(dir.path().join("aa_tree.csv"), "x,y\n1,2\n").unwrap();
        let model = ConstantModel(vec![]);

        let records = predict_directory(
            dir.path(),
            &predictor(),
            &model,
            None,
            BatchPolicy::KeepGoing,
        )
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].file, "aa_tree.csv");
        assert_eq!(records[1].predicted_scorch, None);
        assert!(records[1].error.as_deref().unwrap().contains("'z'"));
        assert_eq!(records[2].predicted_scorch, Some(0.25));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let result = list_point_cloud_files(Path::new("/nonexistent/trees"));
        assert!(matches!(result, Err(ScorchError::Io { .. })));
    }

    #[test]
    fn plot_path_uses_file_stem() {
        assert_eq!(
            plot_path(Some(Path::new("plots")), Path::new("trees/t01.laz")),
            Some(PathBuf::from("plots/t01_histogram.png"))
        );
        assert_eq!(plot_path(None, Path::new("trees/t01.laz")), None);
    }
}
