//! Cross-referencing a catalog's channels, bundles and deprecations

use super::model::{Bundle, Channel, Deprecation, DeprecationScope};
use crate::error::{CatalogError, CatalogResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Join one catalog's records into enriched bundles.
///
/// Every bundle is stamped with `catalog`, gets the channels listing it
/// (sorted by channel name) and the deprecation entries that apply to it.
/// A channel entry naming a bundle that does not exist fails the whole
/// catalog with [`CatalogError::MissingBundle`].
///
/// If a package has more than one deprecation record, the last one wins.
pub fn assemble(
    catalog: &str,
    channels: Vec<Channel>,
    mut bundles: Vec<Bundle>,
    deprecations: Vec<Deprecation>,
) -> CatalogResult<Vec<Bundle>> {
    let mut by_key: HashMap<(String, String), usize> = HashMap::with_capacity(bundles.len());
    for (i, bundle) in bundles.iter_mut().enumerate() {
        bundle.catalog = catalog.to_string();
        by_key.insert((bundle.package.clone(), bundle.name.clone()), i);
    }

    for channel in channels.into_iter().map(Arc::new) {
        for entry in &channel.entries {
            let key = (channel.package.clone(), entry.name.clone());
            let Some(&i) = by_key.get(&key) else {
                return Err(CatalogError::MissingBundle {
                    catalog: catalog.to_string(),
                    package: channel.package.clone(),
                    channel: channel.name.clone(),
                    bundle: entry.name.clone(),
                });
            };
            bundles[i].in_channels.push(Arc::clone(&channel));
        }
    }

    // Channel names are unique per package, so this order is total
    for bundle in &mut bundles {
        bundle.in_channels.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let deprecations: HashMap<String, Deprecation> = deprecations
        .into_iter()
        .map(|d| (d.package.clone(), d))
        .collect();

    for bundle in &mut bundles {
        let Some(deprecation) = deprecations.get(&bundle.package) else {
            continue;
        };
        for entry in &deprecation.entries {
            let applies = match entry.reference.scope() {
                Some(DeprecationScope::Package) => true,
                Some(DeprecationScope::Channel) => bundle
                    .in_channels
                    .iter()
                    .any(|c| c.name == entry.reference.name),
                Some(DeprecationScope::Bundle) => bundle.name == entry.reference.name,
                None => false,
            };
            if applies {
                bundle.deprecations.push(entry.clone());
            }
        }
    }

    Ok(bundles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{ChannelEntry, DeprecationEntry, PackageScopedReference};

    fn bundle(package: &str, name: &str) -> Bundle {
        Bundle {
            package: package.to_string(),
            name: name.to_string(),
            image: None,
            properties: vec![],
            catalog: String::new(),
            in_channels: vec![],
            deprecations: vec![],
        }
    }

    fn channel(package: &str, name: &str, entries: &[&str]) -> Channel {
        Channel {
            package: package.to_string(),
            name: name.to_string(),
            entries: entries
                .iter()
                .map(|e| ChannelEntry {
                    name: e.to_string(),
                    replaces: None,
                    skips: vec![],
                    skip_range: None,
                })
                .collect(),
        }
    }

    fn entry(schema: &str, name: &str, message: &str) -> DeprecationEntry {
        DeprecationEntry {
            reference: PackageScopedReference {
                schema: schema.to_string(),
                name: name.to_string(),
            },
            message: message.to_string(),
        }
    }

    fn find<'a>(bundles: &'a [Bundle], name: &str) -> &'a Bundle {
        bundles.iter().find(|b| b.name == name).unwrap()
    }

    #[test]
    fn stamps_catalog_and_sorts_channels() {
        let bundles = assemble(
            "operatorhub",
            vec![
                channel("foo", "stable", &["foo.v1", "foo.v2"]),
                channel("foo", "alpha", &["foo.v2"]),
                channel("foo", "candidate", &["foo.v2"]),
            ],
            vec![bundle("foo", "foo.v1"), bundle("foo", "foo.v2")],
            vec![],
        )
        .unwrap();

        assert!(bundles.iter().all(|b| b.catalog == "operatorhub"));
        assert_eq!(find(&bundles, "foo.v1").channel_names(), vec!["stable"]);
        assert_eq!(
            find(&bundles, "foo.v2").channel_names(),
            vec!["alpha", "candidate", "stable"]
        );
    }

    #[test]
    fn missing_bundle_is_a_consistency_error() {
        let err = assemble(
            "operatorhub",
            vec![channel("foo", "stable", &["foo.v1"])],
            vec![bundle("bar", "foo.v1")],
            vec![],
        )
        .unwrap_err();

        match err {
            CatalogError::MissingBundle {
                catalog,
                package,
                channel,
                bundle,
            } => {
                assert_eq!(catalog, "operatorhub");
                assert_eq!(package, "foo");
                assert_eq!(channel, "stable");
                assert_eq!(bundle, "foo.v1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bundles_are_keyed_by_package_and_name() {
        let bundles = assemble(
            "c",
            vec![channel("foo", "stable", &["v1"])],
            vec![bundle("foo", "v1"), bundle("bar", "v1")],
            vec![],
        )
        .unwrap();

        let foo = bundles.iter().find(|b| b.package == "foo").unwrap();
        let bar = bundles.iter().find(|b| b.package == "bar").unwrap();
        assert_eq!(foo.channel_names(), vec!["stable"]);
        assert!(bar.in_channels.is_empty());
    }

    #[test]
    fn package_deprecation_reaches_every_bundle() {
        let bundles = assemble(
            "c",
            vec![channel("foo", "stable", &["foo.v1"])],
            vec![bundle("foo", "foo.v1"), bundle("foo", "foo.v2"), bundle("bar", "bar.v1")],
            vec![Deprecation {
                package: "foo".to_string(),
                entries: vec![entry("olm.package", "", "foo is gone")],
            }],
        )
        .unwrap();

        assert_eq!(find(&bundles, "foo.v1").deprecations.len(), 1);
        // Not in any channel, still deprecated
        assert_eq!(find(&bundles, "foo.v2").deprecations.len(), 1);
        assert!(find(&bundles, "bar.v1").deprecations.is_empty());
    }

    #[test]
    fn channel_and_bundle_deprecations_are_scoped() {
        let bundles = assemble(
            "c",
            vec![
                channel("foo", "alpha", &["foo.v1"]),
                channel("foo", "stable", &["foo.v2"]),
            ],
            vec![bundle("foo", "foo.v1"), bundle("foo", "foo.v2")],
            vec![Deprecation {
                package: "foo".to_string(),
                entries: vec![
                    entry("olm.channel", "alpha", "alpha is closed"),
                    entry("olm.bundle", "foo.v2", "broken build"),
                ],
            }],
        )
        .unwrap();

        let v1 = find(&bundles, "foo.v1");
        assert_eq!(v1.deprecations.len(), 1);
        assert_eq!(v1.deprecations[0].message, "alpha is closed");

        let v2 = find(&bundles, "foo.v2");
        assert_eq!(v2.deprecations.len(), 1);
        assert_eq!(v2.deprecations[0].message, "broken build");
    }

    #[test]
    fn later_deprecation_record_overrides_earlier() {
        let bundles = assemble(
            "c",
            vec![],
            vec![bundle("foo", "foo.v1")],
            vec![
                Deprecation {
                    package: "foo".to_string(),
                    entries: vec![entry("olm.package", "", "first")],
                },
                Deprecation {
                    package: "foo".to_string(),
                    entries: vec![entry("olm.package", "", "second")],
                },
            ],
        )
        .unwrap();

        let deps = &bundles[0].deprecations;
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].message, "second");
    }
}
