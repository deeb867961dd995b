//! Shared fixtures for the integration tests
//!
//! Builds applicant records, request bodies, synthetic training files and
//! artifacts whose output probability is known in advance.

#![allow(dead_code)]

use credit_scoring::{
    ml::{
        network::{Activation, Dense, Layer},
        ColumnTransformer, CreditClassifier, FeedForwardNetwork, ModelArtifact, ModelMetadata,
    },
    models::ApplicantRecord,
};
use ndarray::{Array1, Array2};
use serde_json::{json, Value};
use std::fmt::Write;

pub const CSV_HEADER: &str = "umur,jumlah_tanggungan,jumlah_penghasilan,jumlah_tabungan,jumlah_pengajuan,tenor,status_pernikahan,pekerjaan,riwayat_kredit,tujuan_kredit,hasil_klasifikasi";

pub fn applicant(umur: f64, pekerjaan: &str, riwayat_kredit: &str) -> ApplicantRecord {
    ApplicantRecord {
        umur,
        jumlah_tanggungan: 2.0,
        jumlah_penghasilan: 8_000_000.0,
        jumlah_tabungan: 15_000_000.0,
        jumlah_pengajuan: 1.0,
        tenor: 24.0,
        status_pernikahan: "Menikah".to_string(),
        pekerjaan: pekerjaan.to_string(),
        riwayat_kredit: riwayat_kredit.to_string(),
        tujuan_kredit: "Renovasi".to_string(),
        extra: Default::default(),
    }
}

/// Request body with all ten applicant fields
pub fn applicant_json(umur: f64, pekerjaan: &str, riwayat_kredit: &str) -> Value {
    json!({
        "umur": umur,
        "jumlah_tanggungan": 2,
        "jumlah_penghasilan": 8000000,
        "jumlah_tabungan": 15000000,
        "jumlah_pengajuan": 1,
        "tenor": 24,
        "status_pernikahan": "Menikah",
        "pekerjaan": pekerjaan,
        "riwayat_kredit": riwayat_kredit,
        "tujuan_kredit": "Renovasi"
    })
}

pub fn fitted_transform() -> ColumnTransformer {
    let mut transform = ColumnTransformer::new();
    transform
        .fit(&[
            applicant(25.0, "PNS", "Baik"),
            applicant(38.0, "Swasta", "Buruk"),
            applicant(52.0, "Wiraswasta", "Baik"),
            applicant(31.0, "PNS", "Kurang"),
        ])
        .expect("fit transform");
    transform
}

/// Artifact whose classifier ignores its input and always returns `probability`
pub fn constant_artifact(probability: f64) -> ModelArtifact {
    let transform = fitted_transform();
    let width = transform.n_features();

    let network = FeedForwardNetwork::from_layers(vec![Layer::Dense(Dense {
        weights: Array2::zeros((width, 1)),
        bias: Array1::from_elem(1, (probability / (1.0 - probability)).ln()),
        activation: Activation::Sigmoid,
    })])
    .expect("valid network");

    ModelArtifact::new(
        ModelMetadata::new(transform.feature_names()),
        transform,
        CreditClassifier::from_network(network).expect("single output"),
    )
    .expect("consistent artifact")
}

/// Untrained but structurally complete artifact: output depends on the input
pub fn seeded_artifact(seed: u64) -> ModelArtifact {
    let transform = fitted_transform();
    let classifier = CreditClassifier::new(transform.n_features(), seed).expect("classifier");
    ModelArtifact::new(
        ModelMetadata::new(transform.feature_names()),
        transform,
        classifier,
    )
    .expect("consistent artifact")
}

/// Synthetic history where good credit and a civil-servant job mean low risk
pub fn synthetic_csv(rows: usize) -> String {
    let jobs = ["PNS", "Swasta", "Wiraswasta"];
    let purposes = ["Renovasi", "Modal Usaha", "Pendidikan"];

    let mut text = String::from(CSV_HEADER);
    for i in 0..rows {
        let good = i % 2 == 0;
        let umur = 23 + (i * 7) % 35;
        let tanggungan = i % 4;
        let penghasilan = if good { 9_000_000 + (i % 5) * 500_000 } else { 2_500_000 + (i % 5) * 300_000 };
        let tabungan = if good { 20_000_000 + i * 10_000 } else { 500_000 + i * 1_000 };
        let pengajuan = if good { 1 } else { 3 + i % 3 };
        let tenor = [12, 24, 36][i % 3];
        let status = if i % 3 == 0 { "Lajang" } else { "Menikah" };
        let riwayat = if good { "Baik" } else { "Buruk" };
        let outcome = if good {
            if i % 4 == 0 { "Low" } else { "Medium" }
        } else {
            "High"
        };

        write!(
            text,
            "\n{umur},{tanggungan},{penghasilan},{tabungan},{pengajuan},{tenor},{status},{},{riwayat},{},{outcome}",
            jobs[i % 3],
            purposes[i % 3]
        )
        .expect("write to string");
    }
    text.push('\n');
    text
}
