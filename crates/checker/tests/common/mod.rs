use axum::{Router, http::header, routing::get};
pub use testkit::build_pdf;

pub fn paper() -> Vec<u8> {
    build_pdf(&[
        &["Introduction", "Prior work is summarised here."],
        &[
            "Results",
            "We measured reading speed.",
            "Discussion",
            "Findings A and B.",
            "The effect was significant at p<.05.",
            "Conclusion",
            "We conclude the study.",
        ],
    ])
}

/// Serves the test paper, a login page and an image-only PDF.
pub async fn spawn_server() -> String {
    let paper = paper();
    let blank = build_pdf(&[&[]]);

    let app = Router::new()
        .route(
            "/paper.pdf",
            get(move || {
                let paper = paper.clone();
                async move { ([(header::CONTENT_TYPE, "application/pdf")], paper) }
            }),
        )
        .route(
            "/scanned.pdf",
            get(move || {
                let blank = blank.clone();
                async move { ([(header::CONTENT_TYPE, "application/pdf")], blank) }
            }),
        )
        .route(
            "/login",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    "<!doctype html><html><body>Sign in</body></html>",
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
