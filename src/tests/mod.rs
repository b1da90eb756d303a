use crate::analysis::{Manifest, ProjectAnalyzer};
use crate::config::{Config, ScaffoldMode};
use crate::executor::{
    CancellationToken, OutputLayout, ProgressEvent, Reporter, TaskScheduler, TaskStatus,
};
use crate::rewrite::RewriteEngine;
use crate::verify::StructuralVerifier;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

mod error_handling;

pub(crate) const ROUTED_PAGE: &str = r#"import { useRouter } from 'next/router';
import Image from 'next/image';

export default function Profile() {
  const router = useRouter();
  return (
    <div className="profile">
      <Image src="/avatar.png" alt="avatar" width="200" height="100" />
      <button onClick={() => router.push('/home')}>Home</button>
    </div>
  );
}
"#;

pub(crate) const DATA_PAGE: &str = r#"import React from 'react';

export default function Posts({ posts }) {
  return <ul>{posts.map((p) => <li key={p.id}>{p.title}</li>)}</ul>;
}

export async function getStaticProps() {
  const res = await fetch('https://example.com/posts');
  return { props: { posts: await res.json() } };
}
"#;

// Test utilities and helpers
pub(crate) struct TestUtils;

impl TestUtils {
    pub fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// A small Next.js project: two pages, a component, a style sheet, an
    /// asset and a config file.
    pub fn create_next_project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        Self::write(
            root,
            "package.json",
            r#"{"name": "site", "dependencies": {"next": "13.4.0", "react": "18.2.0"}}"#,
        );
        Self::write(root, "next.config.js", "module.exports = {};\n");
        Self::write(root, "pages/profile.js", ROUTED_PAGE);
        Self::write(root, "pages/posts.js", DATA_PAGE);
        Self::write(
            root,
            "components/Nav.jsx",
            "import Link from 'next/link';\n\nexport default function Nav() {\n  return <nav><Link href=\"/\">Home</Link></nav>;\n}\n",
        );
        Self::write(root, "styles/globals.css", "body { margin: 0; }\n");
        Self::write(root, "public/favicon.ico", "icon");
        temp
    }

    /// `count` independent pages named `page00.js`, `page01.js`, ...
    pub fn create_pages_project(count: usize) -> TempDir {
        let temp = TempDir::new().unwrap();
        Self::write(temp.path(), "package.json", r#"{"dependencies": {"next": "13.4.0"}}"#);
        for i in 0..count {
            Self::write(
                temp.path(),
                &format!("pages/page{i:02}.js"),
                &format!("export default function Page{i}() {{\n  return <p>{i}</p>;\n}}\n"),
            );
        }
        temp
    }

    pub fn offline_config() -> Config {
        let mut config = Config::default();
        config.project.scaffold = ScaffoldMode::Skip;
        config.project.install_dependencies = false;
        config
    }

    pub fn manifest(root: &Path) -> Manifest {
        ProjectAnalyzer::new(root, &Config::default()).scan().unwrap()
    }

    pub fn scheduler(
        target: &Path,
        engine: RewriteEngine,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> TaskScheduler {
        TaskScheduler::new(
            Arc::new(engine),
            Arc::new(StructuralVerifier::new()),
            Arc::new(OutputLayout::new(target, "src")),
            reporter,
            cancel,
        )
    }
}

/// Records every event; optionally cancels after a number of finished tasks.
#[derive(Default)]
pub(crate) struct RecordingReporter {
    pub events: Mutex<Vec<ProgressEvent>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingReporter {
    pub fn cancelling_after(finished: usize, cancel: CancellationToken) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel_after: Some((finished, cancel)),
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<(TaskStatus, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::TaskFinished {
                    status, progress, ..
                } => Some((status, progress.completed)),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        let mut events = self.events.lock().unwrap();
        events.push(event);
        if let Some((limit, cancel)) = &self.cancel_after {
            let finished = events
                .iter()
                .filter(|e| matches!(e, ProgressEvent::TaskFinished { .. }))
                .count();
            if finished >= *limit {
                cancel.cancel();
            }
        }
    }
}
