use crate::app::models::NormalizedOptions;
use anyhow::Result;

pub struct OutputGenerator;

impl OutputGenerator {
    pub fn generate_summary(options: &NormalizedOptions) -> String {
        let mut output = String::new();

        let platforms: Vec<String> = options.platforms.iter().map(|p| p.to_string()).collect();
        output.push_str(&format!("platforms: {}\n", platforms.join(", ")));
        output.push_str(&format!(
            "concurrentIoLimit: {}\n",
            options.concurrent_io_limit
        ));
        output.push_str(&format!("hashAlgorithm: {}\n", options.hash_algorithm));

        let skips = options.source_skips.names();
        let skips = if skips.is_empty() {
            "None".to_string()
        } else {
            skips.join(" | ")
        };
        output.push_str(&format!(
            "sourceSkips: {} ({})\n",
            options.source_skips.bits(),
            skips
        ));
        output.push_str(&format!("debug: {}\n", options.debug));
        output.push_str(&format!(
            "enableReactImportsPatcher: {}\n",
            options.enable_react_imports_patcher
        ));

        output.push_str("useCNGForPlatforms:\n");
        for (platform, managed) in &options.use_cng_for_platforms {
            output.push_str(&format!("    {}: {}\n", platform, managed));
        }

        let matchers = options.ignore_paths.matchers();
        output.push_str(&format!("ignorePaths ({}):\n", matchers.len()));
        for matcher in matchers {
            output.push_str(&format!("    {}\n", matcher.pattern()));
        }

        let dirs = options.ignore_paths.dir_matchers();
        output.push_str(&format!("ignoreDirs ({}):\n", dirs.len()));
        for matcher in dirs {
            output.push_str(&format!("    {}/\n", matcher.pattern()));
        }

        output.trim_end().to_string()
    }

    pub fn generate_json(options: &NormalizedOptions) -> Result<String> {
        Ok(serde_json::to_string_pretty(options)?)
    }

    pub fn generate_file_list(files: &[String]) -> String {
        files.join("\n")
    }
}
