//! The parallel probe sweep must reproduce the sequential matcher exactly.
#![cfg(feature = "rayon")]

use iriscode::matching::match_prepared;
use iriscode::{
    evaluate, EvalConfig, IrisTemplate, LabelledTemplate, MatchConfig, Metric, OwnedGrid,
    PackedProbe, TemplateDatabase,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTH: usize = 64;
const HEIGHT: usize = 8;

fn synthetic_template(seed: u64) -> IrisTemplate {
    let mut rng = StdRng::seed_from_u64(seed);
    let code: Vec<u8> = (0..WIDTH * HEIGHT).map(|_| rng.random_range(0..=1)).collect();
    let confidence: Vec<u8> = (0..WIDTH * HEIGHT).map(|_| rng.random_range(1..=255)).collect();
    IrisTemplate::new(
        OwnedGrid::new(code, WIDTH, HEIGHT).unwrap(),
        OwnedGrid::new(confidence, WIDTH, HEIGHT).unwrap(),
    )
    .unwrap()
}

#[test]
fn parallel_evaluation_matches_sequential_matching() {
    let mut db = TemplateDatabase::<u32>::new();
    for seed in 1..=5 {
        let class = format!("s{seed}");
        db.enroll(&format!("{class}-a"), &class, Some(synthetic_template(seed)));
    }
    db.enroll("ghost-a", "ghost", None);

    let probes: Vec<LabelledTemplate> = (1..=5)
        .map(|seed| LabelledTemplate {
            class: format!("s{seed}"),
            template: Some(synthetic_template(100 + seed)),
        })
        .chain(std::iter::once(LabelledTemplate {
            class: "s3".to_string(),
            template: None,
        }))
        .collect();

    let match_cfg = MatchConfig {
        metric: Metric::HammingFbd { alpha: 0.4 },
        fbr: 0.25,
        theta_tolerance: 0.1,
    };
    let eval_cfg = EvalConfig { roc_points: 21 };

    let report = evaluate(&mut db, &probes, &match_cfg, &eval_cfg).unwrap();

    // One probe at a time against the same prepared database.
    db.prepare(match_cfg.fbr).unwrap();
    for (probe, row) in probes.iter().zip(&report.distances) {
        match probe.template.as_ref() {
            Some(template) => {
                let packed = PackedProbe::new(template, &probe.class, match_cfg.fbr).unwrap();
                let ranking = match_prepared(&db, &packed, &match_cfg).unwrap();
                let expected: Vec<f64> = ranking.scores.iter().map(|s| s.distance).collect();
                assert_eq!(row, &expected);
            }
            None => assert!(row.iter().all(|&d| d == 1.0)),
        }
    }

    assert_eq!(report.probe_count, 6);
    assert_eq!(report.enrollment_failures, 1);
    assert_eq!(report.ranks.len(), 6);
}
