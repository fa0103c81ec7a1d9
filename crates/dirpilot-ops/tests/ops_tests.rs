use dirpilot_core::{ItemError, OpError, OpsConfig, PlanningError};
use dirpilot_ops::{
    BatchContext, BatchRequest, BatchStatus, ConflictStrategy, ErrorLedger, IoArgs, IoOperation,
    IoOutcome, OperationExecutor, ProgressEstimate, TransformKind, plan_batch, run_batch,
    start_batch,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn copy_op(source: &Path, destination: &Path, strategy: ConflictStrategy) -> IoOperation {
    IoOperation::Copy {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        strategy,
    }
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_copy_file_reports_progress() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src.txt");
    let dst = temp.path().join("dst.txt");
    fs::write(&src, "hello world").unwrap();

    let estimate = ProgressEstimate::shared();
    let ledger = ErrorLedger::shared();
    let args = IoArgs::new(copy_op(&src, &dst, ConflictStrategy::Fail), Arc::clone(&ledger))
        .with_estimate(Arc::clone(&estimate));

    let executor = OperationExecutor::with_config(OpsConfig::builder().chunk_size(4usize).build().unwrap());
    assert_eq!(executor.execute(&args).unwrap(), IoOutcome::Done);

    assert_eq!(fs::read_to_string(&dst).unwrap(), "hello world");
    let snap = estimate.snapshot();
    assert_eq!(snap.bytes_done, 11);
    assert_eq!(snap.items_done, 1);
    assert!(ledger.is_empty());
}

#[test]
fn test_fail_strategy_refuses_existing_destination() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::write(&src, "new").unwrap();
    fs::write(&dst, "old").unwrap();

    let ledger = ErrorLedger::shared();
    let args = IoArgs::new(copy_op(&src, &dst, ConflictStrategy::Fail), Arc::clone(&ledger));
    let err = OperationExecutor::new().execute(&args).unwrap_err();

    assert!(matches!(
        err,
        OpError::Item(ItemError::DestinationExists { .. })
    ));
    assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.snapshot()[0].destination, Some(dst));
}

#[test]
fn test_declined_confirmation_skips() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::write(&src, "new").unwrap();
    fs::write(&dst, "old").unwrap();

    let args = IoArgs::new(
        copy_op(&src, &dst, ConflictStrategy::ReplaceFiles),
        ErrorLedger::shared(),
    )
    .with_confirm(Arc::new(|_: &Path, _: &Path| false));

    assert_eq!(
        OperationExecutor::new().execute(&args).unwrap(),
        IoOutcome::Skipped
    );
    assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
}

#[test]
fn test_replace_all_does_not_prompt() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::write(&src, "new").unwrap();
    fs::write(&dst, "old").unwrap();

    let asked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&asked);
    let args = IoArgs::new(
        copy_op(&src, &dst, ConflictStrategy::ReplaceAll),
        ErrorLedger::shared(),
    )
    .with_confirm(Arc::new(move |_: &Path, _: &Path| {
        counter.fetch_add(1, Ordering::SeqCst);
        false
    }));

    assert_eq!(
        OperationExecutor::new().execute(&args).unwrap(),
        IoOutcome::Done
    );
    assert_eq!(asked.load(Ordering::SeqCst), 0);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
}

#[test]
fn test_replace_all_merge_removes_extra_items() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(src.join("sub")).unwrap();
    fs::write(src.join("a"), "new a").unwrap();
    fs::write(src.join("sub/b"), "b").unwrap();
    fs::create_dir_all(dst.join("sub")).unwrap();
    fs::write(dst.join("a"), "old a").unwrap();
    fs::write(dst.join("extra"), "x").unwrap();
    fs::write(dst.join("sub/c"), "c").unwrap();

    let args = IoArgs::new(
        copy_op(&src, &dst, ConflictStrategy::ReplaceAll),
        ErrorLedger::shared(),
    );
    assert_eq!(
        OperationExecutor::new().execute(&args).unwrap(),
        IoOutcome::Done
    );

    assert_eq!(names_in(&dst), vec!["a", "sub"]);
    assert_eq!(names_in(&dst.join("sub")), vec!["b"]);
    assert_eq!(fs::read_to_string(dst.join("a")).unwrap(), "new a");
}

#[test]
fn test_replace_files_merge_keeps_extra_items() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&dst).unwrap();
    fs::write(src.join("a"), "new").unwrap();
    fs::write(dst.join("a"), "old").unwrap();
    fs::write(dst.join("extra"), "x").unwrap();

    let args = IoArgs::new(
        copy_op(&src, &dst, ConflictStrategy::ReplaceFiles),
        ErrorLedger::shared(),
    );
    OperationExecutor::new().execute(&args).unwrap();

    assert_eq!(names_in(&dst), vec!["a", "extra"]);
    assert_eq!(fs::read_to_string(dst.join("a")).unwrap(), "new");
}

#[test]
fn test_append_resumes_interrupted_copy() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::write(&src, "hello world").unwrap();
    fs::write(&dst, "hello").unwrap();

    let args = IoArgs::new(
        copy_op(&src, &dst, ConflictStrategy::AppendToFiles),
        ErrorLedger::shared(),
    );
    OperationExecutor::new().execute(&args).unwrap();
    assert_eq!(fs::read_to_string(&dst).unwrap(), "hello world");

    // Already complete: left alone.
    OperationExecutor::new().execute(&args).unwrap();
    assert_eq!(fs::read_to_string(&dst).unwrap(), "hello world");
}

#[cfg(unix)]
#[test]
fn test_copy_recreates_symlinks() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir(&src).unwrap();
    std::os::unix::fs::symlink("missing-target", src.join("link")).unwrap();

    let dst = temp.path().join("dst");
    let args = IoArgs::new(
        copy_op(&src, &dst, ConflictStrategy::Fail),
        ErrorLedger::shared(),
    );
    OperationExecutor::new().execute(&args).unwrap();

    assert_eq!(
        fs::read_link(dst.join("link")).unwrap(),
        PathBuf::from("missing-target")
    );
}

#[test]
fn test_cancelled_copy_leaves_nothing() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::write(&src, "data").unwrap();

    let estimate = ProgressEstimate::shared();
    estimate.cancel();
    let ledger = ErrorLedger::shared();
    let args = IoArgs::new(copy_op(&src, &dst, ConflictStrategy::Fail), Arc::clone(&ledger))
        .with_estimate(estimate);

    assert_eq!(
        OperationExecutor::new().execute(&args).unwrap_err(),
        OpError::Cancelled
    );
    assert!(!dst.exists());
    assert!(ledger.is_empty());
}

#[test]
fn test_move_renames() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("dir");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("f"), "1234").unwrap();
    let dst = temp.path().join("moved");

    let estimate = ProgressEstimate::shared();
    let args = IoArgs::new(
        IoOperation::Move {
            source: src.clone(),
            destination: dst.clone(),
            strategy: ConflictStrategy::Fail,
        },
        ErrorLedger::shared(),
    )
    .with_estimate(Arc::clone(&estimate));
    OperationExecutor::new().execute(&args).unwrap();

    assert!(!src.exists());
    assert_eq!(fs::read_to_string(dst.join("f")).unwrap(), "1234");
    let snap = estimate.snapshot();
    assert_eq!(snap.items_done, 2);
    assert_eq!(snap.bytes_done, 4);
}

#[test]
fn test_remove_and_make_dir() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("a/b/c");
    let executor = OperationExecutor::new();

    let args = IoArgs::new(
        IoOperation::MakeDir {
            path: nested.clone(),
            process_parents: false,
            mode: 0o755,
        },
        ErrorLedger::shared(),
    );
    assert!(executor.execute(&args).is_err());

    let args = IoArgs::new(
        IoOperation::MakeDir {
            path: nested.clone(),
            process_parents: true,
            mode: 0o755,
        },
        ErrorLedger::shared(),
    );
    executor.execute(&args).unwrap();
    assert!(nested.is_dir());

    let args = IoArgs::new(
        IoOperation::Remove {
            path: temp.path().join("a"),
        },
        ErrorLedger::shared(),
    );
    executor.execute(&args).unwrap();
    assert!(!temp.path().join("a").exists());
}

#[cfg(unix)]
#[test]
fn test_recursive_chmod() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("d");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("f"), "").unwrap();

    let args = IoArgs::new(
        IoOperation::Chmod {
            path: dir.clone(),
            mode: 0o750,
            recursive: true,
        },
        ErrorLedger::shared(),
    );
    OperationExecutor::new().execute(&args).unwrap();

    let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&dir), 0o750);
    assert_eq!(mode(&dir.join("f")), 0o750);
}

#[test]
fn test_batch_fail_collision_aborts_rest() {
    let temp = TempDir::new().unwrap();
    let from = temp.path().join("from");
    let to = temp.path().join("to");
    fs::create_dir_all(&from).unwrap();
    fs::create_dir_all(&to).unwrap();
    for name in ["a", "b", "c"] {
        fs::write(from.join(name), name).unwrap();
    }
    fs::write(to.join("b"), "existing").unwrap();

    let sources = vec![from.join("a"), from.join("b"), from.join("c")];
    let plan = plan_batch(BatchRequest::new(sources, &to, TransformKind::Copy)).unwrap();
    let ctx = BatchContext::new(OpsConfig::default());
    let outcome = run_batch(&plan, &ctx, |_, _| {});

    assert_eq!(outcome.status, BatchStatus::Aborted);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
    assert!(ctx.ledger.gave_up());
    assert_eq!(names_in(&to), vec!["a", "b"]);
    assert_eq!(fs::read_to_string(to.join("b")).unwrap(), "existing");
}

#[test]
fn test_batch_continues_past_item_errors() {
    let temp = TempDir::new().unwrap();
    let to = temp.path().join("to");
    fs::create_dir(&to).unwrap();
    let present = temp.path().join("present");
    fs::write(&present, "x").unwrap();

    let sources = vec![temp.path().join("missing"), present];
    let plan = plan_batch(
        BatchRequest::new(sources, &to, TransformKind::Copy)
            .with_strategy(ConflictStrategy::ReplaceFiles),
    )
    .unwrap();
    let ctx = BatchContext::new(OpsConfig::default());
    let outcome = run_batch(&plan, &ctx, |_, _| {});

    assert_eq!(outcome.status, BatchStatus::CompletedWithErrors);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
    assert!(!ctx.ledger.gave_up());
    assert!(matches!(
        ctx.ledger.snapshot()[0].error,
        ItemError::NotFound { .. }
    ));
    assert!(to.join("present").exists());
}

#[test]
fn test_batch_cancelled_up_front() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("a");
    fs::write(&src, "x").unwrap();
    let to = temp.path().join("to");
    fs::create_dir(&to).unwrap();

    let plan = plan_batch(BatchRequest::new(vec![src], &to, TransformKind::Move)).unwrap();
    let ctx = BatchContext::new(OpsConfig::default());
    ctx.estimate.cancel();
    let outcome = run_batch(&plan, &ctx, |_, _| {});

    assert_eq!(outcome.status, BatchStatus::Cancelled);
    assert_eq!(outcome.succeeded, 0);
    assert!(names_in(&to).is_empty());
}

#[test]
fn test_batch_onto_itself_is_rejected() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    fs::write(dir.join("a"), "a").unwrap();

    for kind in [TransformKind::Copy, TransformKind::Move] {
        for confirm in [false, true] {
            let mut request = BatchRequest::new(vec![dir.join("a")], dir, kind)
                .with_strategy(ConflictStrategy::ReplaceFiles);
            if confirm {
                request = request.with_confirm(Arc::new(|_: &Path, _: &Path| true));
            }
            assert!(matches!(
                plan_batch(request).unwrap_err(),
                PlanningError::SelfCollision { .. }
            ));
            assert_eq!(names_in(dir), vec!["a"]);
            assert_eq!(fs::read_to_string(dir.join("a")).unwrap(), "a");
        }
    }
}

#[cfg(unix)]
#[test]
fn test_batch_links() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("target");
    fs::write(&target, "t").unwrap();
    let links = temp.path().join("links");
    fs::create_dir(&links).unwrap();

    let ctx = BatchContext::new(OpsConfig::default());
    let plan = plan_batch(
        BatchRequest::new(vec![target.clone()], &links, TransformKind::LinkRelative)
            .with_names(vec!["rel".into()]),
    )
    .unwrap();
    run_batch(&plan, &ctx, |_, _| {});

    let plan = plan_batch(
        BatchRequest::new(vec![target], &links, TransformKind::LinkAbsolute)
            .with_names(vec!["abs".into()]),
    )
    .unwrap();
    run_batch(&plan, &ctx, |_, _| {});

    let rel = fs::read_link(links.join("rel")).unwrap();
    assert!(!rel.is_absolute());
    assert_eq!(rel, PathBuf::from("../target"));
    assert!(fs::read_link(links.join("abs")).unwrap().is_absolute());
    assert_eq!(fs::read_to_string(links.join("rel")).unwrap(), "t");
}

#[tokio::test]
async fn test_background_batch() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("one"), "1").unwrap();
    fs::write(src.join("two"), "22").unwrap();
    let to = temp.path().join("to");
    fs::create_dir(&to).unwrap();

    let plan = plan_batch(BatchRequest::new(vec![src], &to, TransformKind::Copy)).unwrap();
    let handle = start_batch(plan, OpsConfig::default());
    let ledger = Arc::clone(handle.ledger());
    let outcome = handle.wait().await;

    assert_eq!(outcome.status, BatchStatus::Completed);
    assert_eq!(outcome.succeeded, 1);
    assert!(ledger.is_empty());
    assert_eq!(names_in(&to.join("src")), vec!["one", "two"]);
}

fn move_op(source: &Path, destination: &Path, strategy: ConflictStrategy) -> IoOperation {
    IoOperation::Move {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        strategy,
    }
}

/// A directory of `count` files of `size` bytes each.
fn bulky_tree(dir: &Path, count: usize, size: usize) {
    fs::create_dir_all(dir).unwrap();
    let payload = vec![b'x'; size];
    for i in 0..count {
        fs::write(dir.join(format!("f{i:03}")), &payload).unwrap();
    }
}

#[test]
fn test_move_merges_into_existing_directory() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(src.join("sub")).unwrap();
    fs::write(src.join("a"), "a").unwrap();
    fs::write(src.join("sub/b"), "b").unwrap();
    fs::create_dir_all(&dst).unwrap();
    fs::write(dst.join("c"), "c").unwrap();

    let args = IoArgs::new(
        move_op(&src, &dst, ConflictStrategy::ReplaceFiles),
        ErrorLedger::shared(),
    );
    assert_eq!(
        OperationExecutor::new().execute(&args).unwrap(),
        IoOutcome::Done
    );

    assert!(!src.exists());
    assert_eq!(names_in(&dst), vec!["a", "c", "sub"]);
    assert_eq!(fs::read_to_string(dst.join("sub/b")).unwrap(), "b");
}

#[test]
fn test_move_merge_keeps_declined_children() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&dst).unwrap();
    fs::write(src.join("precious"), "new").unwrap();
    fs::write(src.join("other"), "other").unwrap();
    fs::write(dst.join("precious"), "old").unwrap();

    let ledger = ErrorLedger::shared();
    let args = IoArgs::new(
        move_op(&src, &dst, ConflictStrategy::ReplaceFiles),
        Arc::clone(&ledger),
    )
    .with_confirm(Arc::new(|_: &Path, _: &Path| false));

    assert_eq!(
        OperationExecutor::new().execute(&args).unwrap(),
        IoOutcome::Partial
    );
    assert_eq!(fs::read_to_string(src.join("precious")).unwrap(), "new");
    assert_eq!(fs::read_to_string(dst.join("precious")).unwrap(), "old");
    assert!(!src.join("other").exists());
    assert_eq!(fs::read_to_string(dst.join("other")).unwrap(), "other");
    assert!(ledger.is_empty());
}

#[test]
fn test_move_merge_keeps_file_blocked_by_directory() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(src.join("nested")).unwrap();
    fs::write(src.join("nested/x"), "file").unwrap();
    fs::create_dir_all(dst.join("nested/x")).unwrap();

    let args = IoArgs::new(
        move_op(&src, &dst, ConflictStrategy::ReplaceFiles),
        ErrorLedger::shared(),
    );
    assert_eq!(
        OperationExecutor::new().execute(&args).unwrap(),
        IoOutcome::Partial
    );
    assert_eq!(fs::read_to_string(src.join("nested/x")).unwrap(), "file");
    assert!(dst.join("nested/x").is_dir());
}

#[test]
fn test_zero_chunk_size_still_copies() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::write(&src, "payload").unwrap();

    let config = OpsConfig {
        chunk_size: 0,
        ..Default::default()
    };
    let args = IoArgs::new(copy_op(&src, &dst, ConflictStrategy::Fail), ErrorLedger::shared());
    assert_eq!(
        OperationExecutor::with_config(config).execute(&args).unwrap(),
        IoOutcome::Done
    );
    assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
}

#[test]
fn test_interrupted_overwrite_keeps_old_version() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::write(&src, "new").unwrap();
    fs::write(&dst, "old").unwrap();

    // Cancel at the moment the overwrite is authorised.
    let estimate = ProgressEstimate::shared();
    let flag = Arc::clone(&estimate);
    let args = IoArgs::new(
        copy_op(&src, &dst, ConflictStrategy::ReplaceFiles),
        ErrorLedger::shared(),
    )
    .with_estimate(estimate)
    .with_confirm(Arc::new(move |_: &Path, _: &Path| {
        flag.cancel();
        true
    }));

    assert_eq!(
        OperationExecutor::new().execute(&args).unwrap_err(),
        OpError::Cancelled
    );
    assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
    assert_eq!(names_in(temp.path()), vec!["dst", "src"]);
}

#[test]
fn test_cancelled_directory_copy_is_rolled_back() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    bulky_tree(&src, 64, 256 * 1024);

    let estimate = ProgressEstimate::shared();
    let watcher = Arc::clone(&estimate);
    let canceller = std::thread::spawn(move || {
        while watcher.snapshot().items_done < 2 {
            std::thread::yield_now();
        }
        watcher.cancel();
    });

    let config = OpsConfig::builder().chunk_size(512usize).build().unwrap();
    let args = IoArgs::new(copy_op(&src, &dst, ConflictStrategy::Fail), ErrorLedger::shared())
        .with_estimate(Arc::clone(&estimate));
    let result = OperationExecutor::with_config(config).execute(&args);
    canceller.join().unwrap();

    assert_eq!(result.unwrap_err(), OpError::Cancelled);
    assert!(!dst.exists());
    assert_eq!(names_in(&src).len(), 64);
}

#[test]
fn test_progress_is_visible_during_a_large_copy() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("big");
    let dst = temp.path().join("copy");
    fs::write(&src, vec![b'z'; 8 * 1024 * 1024]).unwrap();

    let estimate = ProgressEstimate::shared();
    let observed = Arc::clone(&estimate);
    let observer = std::thread::spawn(move || {
        loop {
            let snap = observed.snapshot();
            if snap.items_done > 0 {
                return false;
            }
            if snap.bytes_done > 0 {
                return true;
            }
            std::thread::yield_now();
        }
    });

    let config = OpsConfig::builder().chunk_size(1024usize).build().unwrap();
    let args = IoArgs::new(copy_op(&src, &dst, ConflictStrategy::Fail), ErrorLedger::shared())
        .with_estimate(estimate);
    OperationExecutor::with_config(config).execute(&args).unwrap();

    assert!(observer.join().unwrap());
}

#[test]
fn test_batch_cancelled_midway_keeps_completed_items() {
    let temp = TempDir::new().unwrap();
    let from = temp.path().join("from");
    let to = temp.path().join("to");
    fs::create_dir_all(&from).unwrap();
    fs::create_dir_all(&to).unwrap();
    for name in ["a", "b", "c"] {
        fs::write(from.join(name), name).unwrap();
    }

    let sources = vec![from.join("a"), from.join("b"), from.join("c")];
    let plan = plan_batch(BatchRequest::new(sources, &to, TransformKind::Move)).unwrap();
    let ctx = BatchContext::new(OpsConfig::default());
    let outcome = run_batch(&plan, &ctx, |_, _| ctx.estimate.cancel());

    assert_eq!(outcome.status, BatchStatus::Cancelled);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.moved.len(), 1);
    assert_eq!(names_in(&to), vec!["a"]);
    assert_eq!(names_in(&from), vec!["b", "c"]);
}

#[cfg(unix)]
#[test]
fn test_batch_onto_itself_through_symlinked_directory() {
    let temp = TempDir::new().unwrap();
    let real = temp.path().join("real");
    fs::create_dir(&real).unwrap();
    fs::write(real.join("a"), "only copy").unwrap();
    let alias = temp.path().join("alias");
    std::os::unix::fs::symlink(&real, &alias).unwrap();

    for kind in [TransformKind::Copy, TransformKind::Move] {
        let request = BatchRequest::new(vec![alias.join("a")], &real, kind)
            .with_strategy(ConflictStrategy::ReplaceFiles);
        assert!(matches!(
            plan_batch(request).unwrap_err(),
            PlanningError::SelfCollision { .. }
        ));

        let request = BatchRequest::new(vec![real.clone()], &alias, kind);
        assert!(matches!(
            plan_batch(request).unwrap_err(),
            PlanningError::IntoItself { .. }
        ));
    }
    assert_eq!(fs::read_to_string(real.join("a")).unwrap(), "only copy");
}

#[tokio::test]
async fn test_background_batch_cancel() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    bulky_tree(&src, 32, 64 * 1024);
    let to = temp.path().join("to");
    fs::create_dir(&to).unwrap();

    let plan = plan_batch(BatchRequest::new(vec![src.clone()], &to, TransformKind::Copy)).unwrap();
    let config = OpsConfig::builder().chunk_size(512usize).build().unwrap();
    let handle = start_batch(plan, config);
    handle.cancel();
    let outcome = handle.wait().await;

    assert_eq!(outcome.status, BatchStatus::Cancelled);
    assert!(!to.join("src").exists());
    assert_eq!(names_in(&src).len(), 32);
}
