//! Directory listings synthesized from flat keys.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use ftp2s3_core::ErrorKind;
    use ftp2s3_s3::StoreOp;

    use crate::TestServer;

    #[tokio::test]
    async fn test_should_list_files_and_synthesized_directories() {
        let (server, store) = TestServer::with_memory_store().await;
        store.insert("a/b.txt", "0123456789");
        store.insert("a/c/d.txt", "01234");
        let mut client = server.login().await;

        let lines = client.listing("LIST", Some("/a")).await.expect("LIST");
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[0].starts_with("-rw-r--r--"), "{}", lines[0]);
        assert!(lines[0].ends_with(" b.txt"));
        assert!(lines[0].contains(" 10 "));
        assert!(lines[1].starts_with("drwxr-xr-x"), "{}", lines[1]);
        assert!(lines[1].ends_with(" c"));
    }

    #[tokio::test]
    async fn test_should_list_working_directory_by_default() {
        let (server, store) = TestServer::with_memory_store().await;
        store.insert("docs/guide.md", "x");
        store.insert("docs/img/logo.png", "x");
        store.insert("readme.txt", "x");
        let mut client = server.login().await;

        assert_eq!(client.names(None).await, ["docs", "readme.txt"]);
        assert_eq!(client.cmd("CWD docs").await.0, 250);
        assert_eq!(client.names(None).await, ["guide.md", "img"]);
        assert_eq!(client.listing("LIST", Some("-la")).await.expect("LIST").len(), 2);
    }

    #[tokio::test]
    async fn test_should_never_list_duplicate_names() {
        let (server, store) = TestServer::with_memory_store().await;
        for key in [
            "d/report",
            "d/report/2023.csv",
            "d/report/2024.csv",
            "d/x/1",
            "d/x/2",
            "d/x/3/4",
        ] {
            store.insert(key, "x");
        }
        let mut client = server.login().await;

        let names = client.names(Some("/d")).await;
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "{names:?}");
        assert_eq!(names, ["report", "x"]);
    }

    #[tokio::test]
    async fn test_should_not_list_dot_directories() {
        let (server, store) = TestServer::with_memory_store().await;
        store.insert("rel/../up.txt", "up");
        store.insert("rel/./here.txt", "x");
        store.insert("rel/real.txt", "x");
        let mut client = server.login().await;

        assert_eq!(client.names(Some("/rel")).await, ["real.txt"]);
    }

    #[tokio::test]
    async fn test_should_list_more_than_one_page() {
        let (server, store) = TestServer::with_memory_store().await;
        for i in 0..2345 {
            store.insert(format!("bulk/{i:05}.dat"), "x");
        }
        let mut client = server.login().await;

        let names = client.names(Some("/bulk")).await;
        assert_eq!(names.len(), 2345);
        assert_eq!(names.first().map(String::as_str), Some("00000.dat"));
        assert_eq!(names.last().map(String::as_str), Some("02344.dat"));
        assert_eq!(store.call_count(StoreOp::List), 3);
    }

    #[tokio::test]
    async fn test_should_fail_whole_listing_when_a_page_fails() {
        let (server, store) = TestServer::with_memory_store().await;
        for i in 0..1500 {
            store.insert(format!("bulk/{i:05}.dat"), "x");
        }
        // The second page starts after the last key of the first.
        store.inject_fault(StoreOp::List, "bulk/00999.dat", ErrorKind::Transient);
        let mut client = server.login().await;

        let err = client.listing("NLST", Some("/bulk")).await.expect_err("fails");
        assert_eq!(err.0, 451);
        assert_eq!(client.cmd("NOOP").await.0, 200);
    }

    #[tokio::test]
    async fn test_should_list_empty_directory() {
        let (server, _store) = TestServer::with_memory_store().await;
        let mut client = server.login().await;
        assert!(client.names(Some("/nothing/here")).await.is_empty());
    }
}
