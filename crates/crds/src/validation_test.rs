//! Unit tests for validation rules

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::ExecAction;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    use crate::validation::{MountPathError, normalize_path};
    use crate::*;

    fn errors_of(spec: &NginxSpec) -> Vec<FieldError> {
        spec.validate()
            .err()
            .map(|e| e.errors().to_vec())
            .unwrap_or_default()
    }

    fn tls(items: Vec<TLSSecretItem>) -> Option<TLSSecret> {
        Some(TLSSecret {
            secret_name: "tls1".to_string(),
            items,
        })
    }

    #[test]
    fn test_default_spec_is_valid() {
        assert!(NginxSpec::default().validate().is_ok());
    }

    #[test]
    fn test_negative_replicas_rejected() {
        let spec = NginxSpec {
            replicas: Some(-1),
            ..NginxSpec::default()
        };
        assert_eq!(errors_of(&spec), vec![FieldError::NegativeReplicas(-1)]);

        let zero = NginxSpec {
            replicas: Some(0),
            ..NginxSpec::default()
        };
        assert!(zero.validate().is_ok(), "Zero replicas is a valid desired count");
    }

    #[test]
    fn test_configmap_requires_name_and_no_value() {
        let spec = NginxSpec {
            config: Some(ConfigRef {
                kind: Some(ConfigKind::ConfigMap),
                ..ConfigRef::default()
            }),
            ..NginxSpec::default()
        };
        let errors = errors_of(&spec);
        assert_eq!(errors, vec![FieldError::ConfigNameRequired]);
        assert_eq!(errors[0].to_string(), "config.name required for kind ConfigMap");

        let both = NginxSpec {
            config: Some(ConfigRef {
                name: "nginx-conf".to_string(),
                kind: Some(ConfigKind::ConfigMap),
                value: "events {}".to_string(),
            }),
            ..NginxSpec::default()
        };
        assert_eq!(errors_of(&both), vec![FieldError::ConfigValueNotAllowed]);
    }

    #[test]
    fn test_absent_kind_is_treated_as_configmap() {
        let spec = NginxSpec {
            config: Some(ConfigRef::default()),
            ..NginxSpec::default()
        };
        assert_eq!(errors_of(&spec), vec![FieldError::ConfigNameRequired]);
    }

    #[test]
    fn test_inline_requires_value_and_no_name() {
        let empty = NginxSpec {
            config: Some(ConfigRef::inline("")),
            ..NginxSpec::default()
        };
        assert_eq!(errors_of(&empty), vec![FieldError::ConfigValueRequired]);

        let named = NginxSpec {
            config: Some(ConfigRef {
                name: "nginx-conf".to_string(),
                ..ConfigRef::inline("events {}")
            }),
            ..NginxSpec::default()
        };
        assert_eq!(errors_of(&named), vec![FieldError::ConfigNameNotAllowed]);

        let ok = NginxSpec {
            config: Some(ConfigRef::inline("events {}")),
            ..NginxSpec::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_certificates_require_secret_name_and_items() {
        let spec = NginxSpec {
            certificates: Some(TLSSecret::default()),
            ..NginxSpec::default()
        };
        assert_eq!(
            errors_of(&spec),
            vec![FieldError::SecretNameRequired, FieldError::CertificateItemsRequired],
            "Both problems should be reported in one pass"
        );
    }

    #[test]
    fn test_certificate_item_fields_required() {
        let spec = NginxSpec {
            certificates: tls(vec![TLSSecretItem::new("", "tls.key")]),
            ..NginxSpec::default()
        };
        assert_eq!(errors_of(&spec), vec![FieldError::CertificateFieldRequired(0)]);
    }

    #[test]
    fn test_duplicate_tls_paths_rejected() {
        let spec = NginxSpec {
            certificates: tls(vec![
                TLSSecretItem::new("tls.crt", "tls.key"),
                TLSSecretItem {
                    key_path: "tls.key".to_string(),
                    ..TLSSecretItem::new("other.crt", "other.key")
                },
            ]),
            ..NginxSpec::default()
        };
        let errors = errors_of(&spec);
        assert_eq!(errors.len(), 1, "Expected exactly one collision, got {errors:?}");
        assert_eq!(
            errors[0],
            FieldError::PathCollision {
                path: "tls.key".to_string(),
                first: "certificates.items[0].keyPath".to_string(),
                second: "certificates.items[1].keyPath".to_string(),
            }
        );
        assert_eq!(errors[0].field(), "certificates.items[1].keyPath");
    }

    #[test]
    fn test_certificate_and_key_in_same_item_collide() {
        let spec = NginxSpec {
            certificates: tls(vec![TLSSecretItem {
                certificate_path: "bundle.pem".to_string(),
                key_path: "./bundle.pem".to_string(),
                ..TLSSecretItem::new("tls.crt", "tls.key")
            }]),
            ..NginxSpec::default()
        };
        assert!(
            errors_of(&spec)
                .iter()
                .any(|e| matches!(e, FieldError::PathCollision { path, .. } if path == "bundle.pem")),
            "Leading ./ must not hide a collision"
        );
    }

    #[test]
    fn test_tls_and_extra_files_collide() {
        let spec = NginxSpec {
            certificates: tls(vec![TLSSecretItem::new("tls.crt", "tls.key")]),
            extra_files: Some(FilesRef {
                name: "files".to_string(),
                files: BTreeMap::from([("cert".to_string(), "./tls.crt".to_string())]),
            }),
            ..NginxSpec::default()
        };
        assert_eq!(
            errors_of(&spec),
            vec![FieldError::PathCollision {
                path: "tls.crt".to_string(),
                first: "certificates.items[0].certificatePath".to_string(),
                second: "extraFiles.files[cert]".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_extra_file_destinations_rejected() {
        let spec = NginxSpec {
            extra_files: Some(FilesRef {
                name: "files".to_string(),
                files: BTreeMap::from([
                    ("a".to_string(), "app.conf".to_string()),
                    ("b".to_string(), "app.conf".to_string()),
                ]),
            }),
            ..NginxSpec::default()
        };
        let errors = errors_of(&spec);
        assert!(
            matches!(errors.as_slice(), [FieldError::PathCollision { path, .. }] if path == "app.conf"),
            "Expected a single collision on app.conf, got {errors:?}"
        );
    }

    #[test]
    fn test_extra_files_name_and_paths_required() {
        let spec = NginxSpec {
            extra_files: Some(FilesRef {
                name: String::new(),
                files: BTreeMap::from([("a".to_string(), "./".to_string())]),
            }),
            ..NginxSpec::default()
        };
        assert_eq!(
            errors_of(&spec),
            vec![
                FieldError::ExtraFilesNameRequired,
                FieldError::MountPathRequired("extraFiles.files[a]".to_string()),
            ]
        );
    }

    #[test]
    fn test_equivalent_extra_file_paths_collide() {
        for (left, right) in [("x/./b", "x/b"), ("x//b", "x/b"), ("x/b/", "./x/b")] {
            let spec = NginxSpec {
                extra_files: Some(FilesRef {
                    name: "files".to_string(),
                    files: BTreeMap::from([
                        ("a".to_string(), left.to_string()),
                        ("b".to_string(), right.to_string()),
                    ]),
                }),
                ..NginxSpec::default()
            };
            let errors = errors_of(&spec);
            assert!(
                matches!(errors.as_slice(), [FieldError::PathCollision { path, .. }] if path == "x/b"),
                "{left:?} and {right:?} should collide on x/b, got {errors:?}"
            );
        }
    }

    #[test]
    fn test_whitespace_is_part_of_the_path() {
        let spec = NginxSpec {
            extra_files: Some(FilesRef {
                name: "files".to_string(),
                files: BTreeMap::from([
                    ("a".to_string(), "app.conf ".to_string()),
                    ("b".to_string(), "app.conf".to_string()),
                ]),
            }),
            ..NginxSpec::default()
        };
        assert!(
            spec.validate().is_ok(),
            "Trailing whitespace names a different file"
        );
    }

    #[test]
    fn test_extra_file_paths_must_stay_below_mount_root() {
        let spec = NginxSpec {
            extra_files: Some(FilesRef {
                name: "files".to_string(),
                files: BTreeMap::from([
                    ("abs".to_string(), "/app.conf".to_string()),
                    ("up".to_string(), "../../nginx.conf".to_string()),
                    ("mid".to_string(), "sub/../../x".to_string()),
                ]),
            }),
            ..NginxSpec::default()
        };
        let errors = errors_of(&spec);
        assert_eq!(
            errors,
            vec![
                FieldError::MountPathNotRelative {
                    field: "extraFiles.files[abs]".to_string(),
                    path: "/app.conf".to_string(),
                },
                FieldError::MountPathNotRelative {
                    field: "extraFiles.files[mid]".to_string(),
                    path: "sub/../../x".to_string(),
                },
                FieldError::MountPathNotRelative {
                    field: "extraFiles.files[up]".to_string(),
                    path: "../../nginx.conf".to_string(),
                },
            ]
        );
        assert_eq!(errors[0].field(), "extraFiles.files[abs]");
    }

    #[test]
    fn test_tls_paths_must_stay_below_mount_root() {
        let spec = NginxSpec {
            certificates: tls(vec![TLSSecretItem {
                certificate_path: "/".to_string(),
                key_path: "../tls.key".to_string(),
                ..TLSSecretItem::new("tls.crt", "tls.key")
            }]),
            ..NginxSpec::default()
        };
        assert_eq!(
            errors_of(&spec),
            vec![
                FieldError::MountPathNotRelative {
                    field: "certificates.items[0].certificatePath".to_string(),
                    path: "/".to_string(),
                },
                FieldError::MountPathNotRelative {
                    field: "certificates.items[0].keyPath".to_string(),
                    path: "../tls.key".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_tls_path_naming_mount_root_rejected() {
        let spec = NginxSpec {
            certificates: tls(vec![TLSSecretItem {
                certificate_path: "./".to_string(),
                ..TLSSecretItem::new("tls.crt", "tls.key")
            }]),
            ..NginxSpec::default()
        };
        assert_eq!(
            errors_of(&spec),
            vec![FieldError::MountPathRequired(
                "certificates.items[0].certificatePath".to_string()
            )],
            "A resolved path that names the mount root must not be skipped"
        );

        let unnamed = NginxSpec {
            certificates: tls(vec![TLSSecretItem::new("", "tls.key")]),
            ..NginxSpec::default()
        };
        assert_eq!(
            errors_of(&unnamed),
            vec![FieldError::CertificateFieldRequired(0)],
            "A missing field is reported once, not again as an empty path"
        );
    }

    #[test]
    fn test_cache_path_rules() {
        let ok = NginxSpec {
            cache: Some(NginxCacheSpec {
                in_memory: true,
                path: "/var/cache/nginx".to_string(),
                size: Some(Quantity("100Mi".to_string())),
            }),
            ..NginxSpec::default()
        };
        assert!(ok.validate().is_ok());

        let missing = NginxSpec {
            cache: Some(NginxCacheSpec {
                in_memory: true,
                ..NginxCacheSpec::default()
            }),
            ..NginxSpec::default()
        };
        let errors = errors_of(&missing);
        assert_eq!(errors, vec![FieldError::CachePathRequired]);
        assert_eq!(errors[0].to_string(), "cache.path required");

        let relative = NginxSpec {
            cache: Some(NginxCacheSpec {
                path: "cache".to_string(),
                ..NginxCacheSpec::default()
            }),
            ..NginxSpec::default()
        };
        assert_eq!(
            errors_of(&relative),
            vec![FieldError::CachePathNotAbsolute("cache".to_string())]
        );
    }

    #[test]
    fn test_healthcheck_grace_period_and_lifecycle_rules() {
        let spec = NginxSpec {
            healthcheck_path: "healthz".to_string(),
            pod_template: NginxPodTemplateSpec {
                termination_grace_period_seconds: Some(-5),
                ..NginxPodTemplateSpec::default()
            },
            lifecycle: Some(NginxLifecycle {
                post_start: Some(NginxLifecycleHandler {
                    exec: Some(ExecAction {
                        command: Some(vec!["nginx".to_string(), "-t".to_string()]),
                    }),
                }),
                pre_stop: Some(NginxLifecycleHandler::default()),
            }),
            ..NginxSpec::default()
        };
        assert_eq!(
            errors_of(&spec),
            vec![
                FieldError::HealthcheckPathNotAbsolute("healthz".to_string()),
                FieldError::NegativeTerminationGracePeriod(-5),
                FieldError::LifecycleExecRequired("preStop"),
            ]
        );
    }

    #[test]
    fn test_all_errors_reported_together() {
        let spec = NginxSpec {
            replicas: Some(-3),
            config: Some(ConfigRef::default()),
            cache: Some(NginxCacheSpec::default()),
            ..NginxSpec::default()
        };
        let errors = spec.validate().expect_err("spec should be rejected");
        assert_eq!(errors.errors().len(), 3);
        assert_eq!(
            errors.to_string(),
            "replicas must be non-negative, got -3; config.name required for kind ConfigMap; cache.path required"
        );
    }

    #[test]
    fn test_normalize_path() {
        let ok = |path: &str| normalize_path(path).map_err(|e| format!("{path:?}: {e:?}"));
        assert_eq!(ok("app.conf"), Ok("app.conf".to_string()));
        assert_eq!(ok("./app.conf"), Ok("app.conf".to_string()));
        assert_eq!(ok(".//./sub/app.conf"), Ok("sub/app.conf".to_string()));
        assert_eq!(ok("x/./b"), Ok("x/b".to_string()));
        assert_eq!(ok("x//b/"), Ok("x/b".to_string()));
        assert_eq!(ok(" app.conf "), Ok(" app.conf ".to_string()));
        assert_eq!(normalize_path("./."), Err(MountPathError::Empty));
        assert_eq!(normalize_path(""), Err(MountPathError::Empty));
        assert_eq!(normalize_path("/app.conf"), Err(MountPathError::NotRelative));
        assert_eq!(normalize_path("//"), Err(MountPathError::NotRelative));
        assert_eq!(normalize_path("a/../b"), Err(MountPathError::NotRelative));
        assert_eq!(normalize_path("a/..b"), Ok("a/..b".to_string()));
    }
}
