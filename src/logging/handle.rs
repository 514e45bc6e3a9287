use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления lifecycle логирования.
///
/// Держит guard неблокирующего файлового writer-а: пока handle жив, фоновый
/// поток дописывает события в файл; при drop буфер сбрасывается.
#[must_use = "dropping the handle flushes and stops the file writer"]
pub struct LoggingHandle {
    /// File guard (есть, если файловый вывод включён)
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    /// Пишет ли логирование в файл.
    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Явное завершение: сбрасывает файловый буфер.
    pub fn shutdown(mut self) {
        tracing::info!(file_sink = self.has_file_sink(), "Logging shutdown");
        drop(self.file_guard.take());
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_sink", &self.has_file_sink())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_without_file_sink() {
        let handle = LoggingHandle::new(None);
        assert!(!handle.has_file_sink());
        handle.shutdown();
    }

    /// Тест проверяет, что shutdown сбрасывает файловый буфер.
    #[test]
    fn test_shutdown_flushes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let appender = tracing_appender::rolling::never(tmp.path(), "out.log");
        let (mut writer, guard) = tracing_appender::non_blocking(appender);
        let handle = LoggingHandle::new(Some(guard));
        assert!(handle.has_file_sink());

        std::io::Write::write_all(&mut writer, b"flushed line\n").unwrap();
        handle.shutdown();

        let content = std::fs::read_to_string(tmp.path().join("out.log")).unwrap();
        assert!(content.contains("flushed line"));
    }
}
