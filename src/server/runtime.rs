/// Tokio worker thread count.
///
/// `configured` is the already merged `--workers` / `TENT_WORKERS` /
/// `server.workers` value. Without one, one worker per available core.
pub fn worker_threads(configured: Option<usize>) -> usize {
    match configured {
        Some(n) if n > 0 => n,
        _ => std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_count_wins() {
        assert_eq!(worker_threads(Some(3)), 3);
    }

    #[test]
    fn falls_back_to_available_cores() {
        assert!(worker_threads(None) >= 1);
        assert!(worker_threads(Some(0)) >= 1);
    }
}
