//! Artifact writer
//!
//! Produces the three files every published repository carries.

use pagesmith_foundation::{Error, Result, Stage};
use std::path::Path;
use tracing::debug;

pub const INDEX_FILE: &str = "index.html";
pub const README_FILE: &str = "README.md";
pub const LICENSE_FILE: &str = "LICENSE";

/// MIT license text written to every repository
pub const LICENSE_TEXT: &str = "MIT License

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
";

/// README content for a task
pub fn render_readme(task: &str, brief: &str, checks: &[String]) -> String {
    let mut readme = format!("# {}\n\n{}\n\n## Checks\n", task, brief);
    for check in checks {
        readme.push_str("- ");
        readme.push_str(check);
        readme.push('\n');
    }
    readme.push_str("\n## License\nMIT\n");
    readme
}

/// Write `index.html`, `README.md` and `LICENSE` into `dir`, replacing any
/// previous versions
pub async fn write_artifacts(
    dir: &Path,
    html: &str,
    task: &str,
    brief: &str,
    checks: &[String],
) -> Result<()> {
    let files = [
        (INDEX_FILE, html.to_string()),
        (README_FILE, render_readme(task, brief, checks)),
        (LICENSE_FILE, LICENSE_TEXT.to_string()),
    ];

    for (name, content) in files {
        tokio::fs::write(dir.join(name), content)
            .await
            .map_err(Error::io(Stage::WriteArtifacts))?;
        debug!("Wrote {}", name);
    }
    Ok(())
}
