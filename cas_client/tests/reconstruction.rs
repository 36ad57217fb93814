//! End-to-end reconstruction tests against a directory-backed local
//! endpoint: files are uploaded as xorbs plus an MDB shard, then pulled back
//! through the full resolve / parallel-fetch / assemble pipeline.

use std::io::Write;
use std::sync::{Arc, Mutex};

use cas_client::{Client, DataOutput, FileReconstructor, LocalClient, RandomFileContents};
use cas_types::FileRange;
use xorb_format::CompressionScheme;

/// Small chunks so even small files span many records.
const CHUNK_SIZE: usize = 579;

fn upload_file(client: &Arc<LocalClient>, term_spec: &[(u64, (u32, u32))]) -> RandomFileContents {
    client.upload_random_file(term_spec, CHUNK_SIZE).unwrap()
}

/// A writer handing bytes to a shared buffer, for DataOutput::writer tests.
#[derive(Clone, Default)]
struct SharedBufferWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Reconstructs via every output path and checks all against the expectation.
async fn check_reconstruction(client: &Arc<LocalClient>, file: &RandomFileContents, range: Option<FileRange>) {
    let expected = match range {
        Some(r) => &file.data[r.start as usize..r.end as usize],
        None => &file.data[..],
    };

    let client_dyn: Arc<dyn Client> = client.clone();
    let reconstructor = FileReconstructor::new(&client_dyn).with_num_workers(4);

    // In-memory path.
    let bytes = reconstructor.reconstruct_to_bytes(&file.file_hash, range).await.unwrap();
    assert_eq!(bytes, expected, "reconstruct_to_bytes mismatch");

    // Streaming writer path.
    let writer = SharedBufferWriter::default();
    let written = reconstructor
        .reconstruct_to_output(&file.file_hash, range, DataOutput::writer(writer.clone()))
        .await
        .unwrap();
    assert_eq!(written as usize, expected.len());
    assert_eq!(*writer.0.lock().unwrap(), expected, "writer output mismatch");

    // File path; data lands at the range start offset.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.bin");
    reconstructor
        .reconstruct_to_output(&file.file_hash, range, DataOutput::write_in_file(&path))
        .await
        .unwrap();
    let file_data = std::fs::read(&path).unwrap();
    let start = range.map(|r| r.start as usize).unwrap_or(0);
    assert_eq!(&file_data[start..], expected, "file output mismatch");
}

#[tokio::test]
async fn test_single_term_full_file() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 3))]);
    check_reconstruction(&client, &file, None).await;
}

#[tokio::test]
async fn test_single_chunk_file() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 1))]);
    check_reconstruction(&client, &file, None).await;
}

#[tokio::test]
async fn test_multi_term_multi_xorb_full_file() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 2)), (2, (0, 3)), (1, (2, 4))]);
    check_reconstruction(&client, &file, None).await;
}

#[tokio::test]
async fn test_many_terms() {
    let client = LocalClient::temporary().unwrap();
    let term_spec: Vec<(u64, (u32, u32))> = (0..12).map(|i| (i, (0, 2))).collect();
    let file = upload_file(&client, &term_spec);
    check_reconstruction(&client, &file, None).await;
}

#[tokio::test]
async fn test_xorb_reuse_across_terms() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 2)), (2, (0, 2)), (1, (2, 4)), (2, (2, 4)), (1, (0, 2))]);
    check_reconstruction(&client, &file, None).await;
}

#[tokio::test]
async fn test_all_compression_schemes_round_trip() {
    for scheme in [
        CompressionScheme::None,
        CompressionScheme::LZ4,
        CompressionScheme::ByteGrouping4LZ4,
        CompressionScheme::FullBitsliceLZ4,
    ] {
        let client = LocalClient::temporary().unwrap();
        let file = client
            .upload_random_file_with_scheme(&[(1, (0, 3)), (2, (0, 2))], CHUNK_SIZE, scheme)
            .unwrap();
        check_reconstruction(&client, &file, None).await;
    }
}

#[tokio::test]
async fn test_range_from_start() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 5))]);
    let half = file.data.len() as u64 / 2;
    check_reconstruction(&client, &file, Some(FileRange::new(0, half))).await;
}

#[tokio::test]
async fn test_range_middle() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 6))]);
    let len = file.data.len() as u64;
    check_reconstruction(&client, &file, Some(FileRange::new(len / 4, len * 3 / 4))).await;
}

#[tokio::test]
async fn test_range_to_end() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 5))]);
    let len = file.data.len() as u64;
    check_reconstruction(&client, &file, Some(FileRange::new(len / 2, len))).await;
}

#[tokio::test]
async fn test_range_spanning_terms() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 3)), (2, (0, 2)), (3, (0, 3))]);
    let term1 = file.terms[0].data.len() as u64;
    let term2 = file.terms[1].data.len() as u64;
    check_reconstruction(&client, &file, Some(FileRange::new(term1 / 2, term1 + term2 / 2))).await;
}

#[tokio::test]
async fn test_single_byte_ranges() {
    let client = LocalClient::temporary().unwrap();
    let file = upload_file(&client, &[(1, (0, 3))]);
    let len = file.data.len() as u64;

    check_reconstruction(&client, &file, Some(FileRange::new(0, 1))).await;
    check_reconstruction(&client, &file, Some(FileRange::new(len / 2, len / 2 + 1))).await;
    check_reconstruction(&client, &file, Some(FileRange::new(len - 1, len))).await;
}

/// Deterministic but content-varied bytes, enough to span many chunks.
fn patterned_bytes(n: usize) -> Vec<u8> {
    let mut state = 0x243F_6A88_85A3_08D3u64;
    let mut out = Vec::with_capacity(n + 8);
    while out.len() < n {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        out.extend_from_slice(&state.to_le_bytes());
        // Interleave a compressible stretch so both codec paths occur.
        out.extend_from_slice(&[0u8; 8]);
    }
    out.truncate(n);
    out
}

#[tokio::test]
async fn test_chunked_upload_round_trip() {
    let client = LocalClient::temporary().unwrap();
    let data = patterned_bytes(1 << 20);
    let file = client.upload_bytes(&data, CompressionScheme::LZ4).unwrap();

    assert_eq!(file.data, data);
    check_reconstruction(&client, &file, None).await;

    let len = data.len() as u64;
    check_reconstruction(&client, &file, Some(FileRange::new(len / 3, 2 * len / 3))).await;
}

#[tokio::test]
async fn test_chunked_upload_small_file() {
    let client = LocalClient::temporary().unwrap();
    let data = b"tiny file below the minimum chunk size".to_vec();
    let file = client.upload_bytes(&data, CompressionScheme::ByteGrouping4LZ4).unwrap();

    assert_eq!(file.terms.len(), 1);
    check_reconstruction(&client, &file, None).await;
}

#[tokio::test]
async fn test_unknown_file_fails_cleanly() {
    let client = LocalClient::temporary().unwrap();
    let client_dyn: Arc<dyn Client> = client.clone();
    let reconstructor = FileReconstructor::new(&client_dyn);

    let missing = xethash::compute_data_hash(b"no such file");
    let err = reconstructor.reconstruct_to_bytes(&missing, None).await.unwrap_err();
    assert!(matches!(err, cas_client::CasClientError::ReconstructionUnavailable(_)));
}

#[tokio::test]
async fn test_worker_count_does_not_change_output() {
    let client = LocalClient::temporary().unwrap();
    let term_spec: Vec<(u64, (u32, u32))> = (0..8).map(|i| (i % 3, (i as u32 % 3, i as u32 % 3 + 2))).collect();
    let file = upload_file(&client, &term_spec);
    let client_dyn: Arc<dyn Client> = client.clone();

    for workers in [1, 2, 8] {
        let reconstructor = FileReconstructor::new(&client_dyn).with_num_workers(workers);
        let bytes = reconstructor.reconstruct_to_bytes(&file.file_hash, None).await.unwrap();
        assert_eq!(bytes, file.data, "mismatch with {workers} workers");
    }
}
