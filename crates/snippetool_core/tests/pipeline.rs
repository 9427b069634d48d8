use std::fs;
use std::path::Path;

use snippetool_core::config::default_config;
use snippetool_core::extract::{ExtractOptions, run_extract};
use snippetool_core::filesystem::write_text_file;
use snippetool_core::generate::run_generate;
use snippetool_core::runtime::{PathOverrides, ResolutionContext, resolve_paths_with_lookup};
use snippetool_core::snapshot::snapshot_outputs;
use tempfile::tempdir;

const LCP: &str = "# Largest Contentful Paint\n\
\n\
Quick way to find the [LCP](https://web.dev/lcp) element on the page.\n\
\n\
## Find LCP element\n\
\n\
Logs the element that produced the largest paint.\n\
\n\
**Thresholds:**\n\
\n\
| Rating | Time |\n\
| --- | --- |\n\
| 🟢 Good | <= 2.5s |\n\
\n\
### Snippet\n\
\n\
```js copy\n\
new PerformanceObserver((list) => {\n\
  console.log(list.getEntries().at(-1))\n\
}).observe({ type: 'largest-contentful-paint', buffered: true })\n\
```\n\
\n\
## Measure LCP sub-parts\n\
\n\
Breaks the LCP time into `TTFB`, load delay, load time and render delay.\n\
\n\
### Snippet\n\
\n\
```js copy\n\
const parts = ['ttfb', 'delay']\n\
\n\
console.table(parts)\n\
```\n";

const TTFB: &str = "# Time To First Byte\n\
\n\
Measures the time between the request and the first byte of the response.\n\
\n\
### Snippet\n\
\n\
```js copy\n\
console.log(performance.getEntriesByType('navigation')[0].responseStart)\n\
```\n";

const INDEX: &str = "# WebPerf Snippets\n\nNothing to extract here.\n";

fn seed(root: &Path) {
    write_text_file(&root.join("pages/CoreWebVitals/LCP.mdx"), LCP).expect("write lcp");
    write_text_file(&root.join("pages/Loading/TTFB.mdx"), TTFB).expect("write ttfb");
    write_text_file(&root.join("pages/index.mdx"), INDEX).expect("write index");
}

fn resolved(root: &Path) -> snippetool_core::runtime::ResolvedPaths {
    let context = ResolutionContext {
        cwd: root.to_path_buf(),
        executable_dir: None,
    };
    let overrides = PathOverrides {
        project_root: Some(root.to_path_buf()),
        config: None,
    };
    let config = default_config().expect("config");
    resolve_paths_with_lookup(&context, &overrides, |_| None)
        .expect("resolve")
        .with_layout(&config.paths)
}

#[test]
fn extract_then_generate_end_to_end() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path();
    seed(root);
    let paths = resolved(root);
    let config = default_config().expect("config");

    let extracted = run_extract(&paths, &config, &ExtractOptions::default()).expect("extract");
    assert_eq!(extracted.scanned, 3);
    assert_eq!(
        extracted.created,
        vec![
            "snippets/CoreWebVitals/LCP.js",
            "snippets/CoreWebVitals/LCP-Sub-Parts.js",
            "snippets/Loading/TTFB.js",
        ]
    );
    assert_eq!(
        fs::read_to_string(root.join("snippets/CoreWebVitals/LCP-Sub-Parts.js"))
            .expect("read artifact"),
        "const parts = ['ttfb', 'delay']\n\nconsole.table(parts)\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("pages/index.mdx")).expect("read index"),
        INDEX
    );

    let lcp = fs::read_to_string(root.join("pages/CoreWebVitals/LCP.mdx")).expect("read lcp");
    assert!(lcp.starts_with(
        "import snippet from '../../snippets/CoreWebVitals/LCP.js?raw'\n\
import snippet2 from '../../snippets/CoreWebVitals/LCP-Sub-Parts.js?raw'\n\
import { Snippet } from '../../components/Snippet'\n\n# Largest Contentful Paint\n"
    ));
    assert_eq!(lcp.matches("<Snippet code={").count(), 2);

    let generated = run_generate(&paths, &config).expect("generate");
    assert_eq!(generated.total_artifacts, 3);
    assert!(generated.unlocated.is_empty());

    let vitals = fs::read_to_string(root.join("skills/webperf-core-web-vitals/SKILL.md"))
        .expect("read vitals manifest");
    assert!(vitals.contains("## Largest Contentful Paint: Find LCP element\n\nLogs the element that produced the largest paint.\n"));
    assert!(vitals.contains("## Largest Contentful Paint: Measure LCP sub-parts\n\nBreaks the LCP time into TTFB, load delay, load time and render delay.\n"));
    assert!(vitals.contains("**Thresholds:**\n\n| Rating | Time |\n| --- | --- |\n| 🟢 Good | <= 2.5s |\n"));
    assert!(vitals.contains("scripts/LCP-Sub-Parts.js"));
    assert!(root.join("skills/webperf-core-web-vitals/scripts/LCP.js").exists());

    let loading = fs::read_to_string(root.join("skills/webperf-loading/SKILL.md"))
        .expect("read loading manifest");
    assert!(loading.contains(
        "| Time To First Byte | Measures the time between the request and the first byte of the response | scripts/TTFB.js |"
    ));

    let umbrella =
        fs::read_to_string(root.join("skills/webperf/SKILL.md")).expect("read umbrella");
    assert!(umbrella.contains("A collection of 3 JavaScript snippets"));
}

#[test]
fn reruns_change_nothing() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path();
    seed(root);
    let paths = resolved(root);
    let config = default_config().expect("config");

    run_extract(&paths, &config, &ExtractOptions::default()).expect("first extract");
    run_generate(&paths, &config).expect("first generate");
    let first = snapshot_outputs(&paths).expect("first snapshot");
    let lcp_after_first =
        fs::read_to_string(root.join("pages/CoreWebVitals/LCP.mdx")).expect("read lcp");

    let second = run_extract(&paths, &config, &ExtractOptions::default()).expect("second extract");
    assert!(second.created.is_empty());
    assert!(second.updated.is_empty());
    run_generate(&paths, &config).expect("second generate");

    assert_eq!(snapshot_outputs(&paths).expect("second snapshot"), first);
    assert_eq!(
        fs::read_to_string(root.join("pages/CoreWebVitals/LCP.mdx")).expect("read lcp"),
        lcp_after_first
    );
}
