use std::fs;

use tempfile::TempDir;

use ctxret_core::config::{expand_path, resolve_with_base, validate_weights, Config, ContextProvider, Settings};
use ctxret_core::loader::load_document;
use ctxret_core::{Chunker, ChunkingConfig, Error, Tokenization};

fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
}

#[test]
fn chunker_windows_overlap_and_stop_at_end() {
    let chunker = Chunker::new(ChunkingConfig::new(4, 2).expect("config"), Tokenization::Whitespace).expect("chunker");
    let chunks = chunker.chunk(&words(8)).expect("chunk");

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["w0 w1 w2 w3", "w2 w3 w4 w5", "w4 w5 w6 w7"]);
    let ids: Vec<u64> = chunks.iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!((chunks[1].start_token, chunks[1].end_token), (2, 6));
    assert!(chunks.iter().all(|c| c.context.is_none() && c.embedding.is_none()));
}

#[test]
fn chunker_short_document_is_one_chunk() {
    let chunker = Chunker::new(ChunkingConfig::default(), Tokenization::Whitespace).expect("chunker");
    let chunks = chunker.chunk("Short text\n\nwith two lines").expect("chunk");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Short text\n\nwith two lines");
}

#[test]
fn chunker_empty_text_has_no_chunks() {
    let chunker = Chunker::new(ChunkingConfig::default(), Tokenization::Whitespace).expect("chunker");
    assert!(chunker.chunk("").expect("chunk").is_empty());
    assert!(chunker.chunk("   \n\t ").expect("chunk").is_empty());
}

#[test]
fn chunker_rejects_overlap_not_smaller_than_size() {
    assert!(matches!(ChunkingConfig::new(4, 4), Err(Error::InvalidConfig(_))));
    assert!(matches!(ChunkingConfig::new(0, 0), Err(Error::InvalidConfig(_))));
    let bad = ChunkingConfig { chunk_size: 3, chunk_overlap: 5 };
    assert!(Chunker::new(bad, Tokenization::Whitespace).is_err());
}

#[test]
fn chunker_slices_original_text() {
    let chunker = Chunker::new(ChunkingConfig::new(2, 0).expect("config"), Tokenization::Whitespace).expect("chunker");
    let chunks = chunker.chunk("naïve  café\tcrème brûlée").expect("chunk");
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["naïve  café", "crème brûlée"]);
}

#[test]
fn load_text_and_markdown_documents() {
    let tmp = TempDir::new().expect("tempdir");
    let txt = tmp.path().join("a.txt");
    let md = tmp.path().join("b.MD");
    fs::write(&txt, "alpha bravo").expect("write");
    fs::write(&md, b"# title\n\xffbody").expect("write");

    assert_eq!(load_document(&txt).expect("txt"), "alpha bravo");
    let body = load_document(&md).expect("md");
    assert!(body.starts_with("# title\n"));
    assert!(body.ends_with("body"));
}

#[test]
fn load_document_errors() {
    let tmp = TempDir::new().expect("tempdir");
    let missing = tmp.path().join("missing.txt");
    assert!(matches!(load_document(&missing), Err(Error::NotFound(_))));

    let docx = tmp.path().join("c.docx");
    fs::write(&docx, "x").expect("write");
    assert!(matches!(load_document(&docx), Err(Error::UnsupportedFormat(_))));
}

#[test]
fn config_defaults_without_files() {
    figment::Jail::expect_with(|_jail| {
        let config = Config::load_for_env("test").map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retrieval.overfetch_factor, 2);
        assert_eq!(settings.context.provider, ContextProvider::Mock);
        Ok(())
    });
}

#[test]
fn config_layers_file_env_file_and_env_vars() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [chunking]
            chunk_size = 400
            chunk_overlap = 100

            [context]
            provider = "anthropic"
            "#,
        )?;
        jail.create_file("config.test.toml", "[retrieval]\ntop_k = 7\n")?;
        jail.set_env("APP_RETRIEVAL__VECTOR_WEIGHT", "0.7");

        let config = Config::load_for_env("test").map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.chunking.chunk_size, 400);
        assert_eq!(settings.chunking.chunk_overlap, 100);
        assert_eq!(settings.retrieval.top_k, 7);
        assert!((settings.retrieval.vector_weight - 0.7).abs() < 1e-6);
        assert_eq!(settings.context.provider, ContextProvider::Anthropic);

        let top_k: usize = config.get("retrieval.top_k").map_err(|e| e.to_string())?;
        assert_eq!(top_k, 7);
        Ok(())
    });
}

#[test]
fn config_rejects_invalid_chunking() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n")?;
        assert!(matches!(Config::load_for_env("test"), Err(Error::InvalidConfig(_))));
        Ok(())
    });
}

#[test]
fn weights_validation() {
    assert!(validate_weights(0.5, 0.5).is_ok());
    assert!(validate_weights(0.0, 1.0).is_ok());
    assert!(validate_weights(0.0, 0.0).is_err());
    assert!(validate_weights(-0.1, 1.0).is_err());
    assert!(validate_weights(f32::NAN, 1.0).is_err());
}

#[test]
fn path_helpers_expand_and_resolve() {
    std::env::set_var("CTXRET_TEST_DIR", "/tmp/ctxret");
    assert_eq!(expand_path("${CTXRET_TEST_DIR}/db"), std::path::PathBuf::from("/tmp/ctxret/db"));
    let base = std::path::Path::new("/base");
    assert_eq!(resolve_with_base(base, "rel/x"), base.join("rel/x"));
    assert_eq!(resolve_with_base(base, "/abs/x"), std::path::PathBuf::from("/abs/x"));
}
