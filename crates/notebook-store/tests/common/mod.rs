//! Shared fixtures for store integration tests.
#![allow(dead_code)]

use std::path::Path;

use notebook_store::{NotebookStore, StoreConfig};
use uuid::Uuid;

/// A 4-cell notebook matching the shape the whole suite leans on:
/// markdown header, two code cells, one empty code cell.
pub const SIMPLE_NB: &str = r###"{
    "cells": [
        {
            "cell_type": "markdown",
            "metadata": {},
            "source": ["## Simple Test Notebook"]
        },
        {
            "cell_type": "code",
            "execution_count": 1,
            "metadata": {},
            "outputs": [
                {"output_type": "stream", "name": "stdout", "text": ["Larry the Llama\n"]}
            ],
            "source": ["print(\"Larry the Llama\")"]
        },
        {
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": ["2+5"]
        },
        {
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": []
        }
    ],
    "metadata": {
        "kernelspec": {
            "name": "python3",
            "display_name": "Python 3",
            "language": "python"
        }
    },
    "nbformat": 4,
    "nbformat_minor": 5
}"###;

pub fn store(root: &Path) -> NotebookStore {
    NotebookStore::new(StoreConfig {
        root_dir: root.to_path_buf(),
    })
}

/// Upload the fixture as `simple.ipynb` and open it.
pub async fn upload_and_open_simple(store: &mut NotebookStore) -> Uuid {
    let path = store
        .upload(SIMPLE_NB.as_bytes(), "simple.ipynb", None)
        .await
        .unwrap();
    assert_eq!(path, Path::new("simple.ipynb"));
    store.open("simple.ipynb", None).await.unwrap().uuid
}

pub fn cell_uuids(store: &NotebookStore, uuid: Uuid) -> Vec<Uuid> {
    store
        .cells(uuid)
        .unwrap()
        .iter()
        .map(|c| c.uuid)
        .collect()
}

/// Parse a notebook file below the root for on-disk assertions.
pub fn read_disk(root: &Path, name: &str) -> serde_json::Value {
    let data = std::fs::read(root.join(name)).unwrap();
    serde_json::from_slice(&data).unwrap()
}

pub fn disk_cell_uuids(value: &serde_json::Value) -> Vec<String> {
    value["cells"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["metadata"]["nbstore"]["uuid"].as_str().unwrap().to_string())
        .collect()
}

pub fn disk_document_uuid(value: &serde_json::Value) -> String {
    value["metadata"]["nbstore"]["uuid"]
        .as_str()
        .unwrap()
        .to_string()
}
