//! Conversion from configuration to bundler build options.

use std::path::Path;

use trellis_bundler::{
    BuildOptions, I18nOptions, IndexHtmlOptions, LocaleDescription, OptimizationOptions,
    ServiceWorkerOptions,
};

use crate::config::TrellisConfig;

impl TrellisConfig {
    /// Build the library-level options for one builder invocation.
    ///
    /// `watch` decides whether incremental state is retained in results.
    pub fn to_build_options(&self, project_root: &Path, watch: bool) -> BuildOptions {
        let mut options = BuildOptions::new(project_root, self.entry_points.iter().cloned());
        options.global_styles = self.global_styles.clone();
        options.lazy_global_styles = self.lazy_global_styles.clone();
        options.global_scripts = self.global_scripts.clone();
        options.lazy_global_scripts = self.lazy_global_scripts.clone();
        options.server_entry = self.server_entry.clone();
        options.supported_browsers = self.supported_browsers.clone();
        options.external = self.external.clone();
        options.sourcemap = self.sourcemap;
        options.optimization = if self.optimize {
            OptimizationOptions::all()
        } else {
            OptimizationOptions::default()
        };
        options.output_hashing = self.output_hashing;
        options.base_href = self.base_href.clone();
        options.deploy_url = self.deploy_url.clone();
        options.index = self.index.as_ref().map(|index| IndexHtmlOptions {
            input: index.input.clone(),
            output: index.output.clone(),
            subresource_integrity: index.subresource_integrity,
            cross_origin: index.cross_origin.clone(),
        });
        options.assets = self.assets.clone();
        options.extract_licenses = self.extract_licenses;
        options.service_worker = self.service_worker.as_ref().map(|sw| ServiceWorkerOptions {
            config_path: sw.config_path.clone(),
            index: sw.index.clone(),
        });
        options.budgets = self.budgets.clone();
        options.allowed_commonjs_dependencies = self.allowed_common_js_dependencies.clone();
        options.i18n = self.i18n.as_ref().map(|i18n| {
            let mut locales: Vec<LocaleDescription> = i18n
                .locales
                .iter()
                .map(|(id, file)| LocaleDescription {
                    id: id.clone(),
                    translation_file: file.as_ref().map(|f| project_root.join(f)),
                })
                .collect();
            // Map iteration order is arbitrary; locale output must not be.
            locales.sort_by(|a, b| a.id.cmp(&b.id));
            I18nOptions {
                source_locale: i18n.source_locale.clone(),
                locales,
            }
        });
        options.stats_json = self.stats_json;
        options.watch = watch;
        options
    }
}
