//! Ownership and access-control types shared by buckets and objects.

use serde::{Deserialize, Serialize};

/// Fixed synthetic owner attached to every bucket/object. IAM is out of
/// scope, so there is exactly one owner identity across the whole emulator.
pub fn synthetic_owner() -> Owner {
    Owner {
        id: "s3emu".to_string(),
        display_name: "S3 Emulator".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Permission {
    FullControl,
    Read,
    Write,
    ReadAcp,
    WriteAcp,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::FullControl => "FULL_CONTROL",
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::ReadAcp => "READ_ACP",
            Permission::WriteAcp => "WRITE_ACP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grantee {
    Owner(Owner),
    AllUsers,
    AuthenticatedUsers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: Permission,
}

/// A resolved ACL: the owner plus the grants currently in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub owner: Owner,
    pub grants: Vec<Grant>,
}

/// The canned ACL names S3 accepts on the `x-amz-acl` header / `?acl` PUT body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl CannedAcl {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(Self::Private),
            "public-read" => Some(Self::PublicRead),
            "public-read-write" => Some(Self::PublicReadWrite),
            "authenticated-read" => Some(Self::AuthenticatedRead),
            "bucket-owner-read" => Some(Self::BucketOwnerRead),
            "bucket-owner-full-control" => Some(Self::BucketOwnerFullControl),
            _ => None,
        }
    }

    /// Expand a canned ACL into its concrete grant set for a given owner.
    pub fn expand(&self, owner: &Owner) -> Acl {
        let owner_grant = Grant {
            grantee: Grantee::Owner(owner.clone()),
            permission: Permission::FullControl,
        };
        let grants = match self {
            CannedAcl::Private => vec![owner_grant],
            CannedAcl::PublicRead => vec![
                owner_grant,
                Grant {
                    grantee: Grantee::AllUsers,
                    permission: Permission::Read,
                },
            ],
            CannedAcl::PublicReadWrite => vec![
                owner_grant,
                Grant {
                    grantee: Grantee::AllUsers,
                    permission: Permission::Read,
                },
                Grant {
                    grantee: Grantee::AllUsers,
                    permission: Permission::Write,
                },
            ],
            CannedAcl::AuthenticatedRead => vec![
                owner_grant,
                Grant {
                    grantee: Grantee::AuthenticatedUsers,
                    permission: Permission::Read,
                },
            ],
            // Bucket-owner grants are meaningless without cross-account IAM;
            // treated the same as `private` since there is only ever one owner.
            CannedAcl::BucketOwnerRead | CannedAcl::BucketOwnerFullControl => vec![owner_grant],
        };
        Acl {
            owner: owner.clone(),
            grants,
        }
    }
}

impl Default for Acl {
    fn default() -> Self {
        CannedAcl::Private.expand(&synthetic_owner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_acl_grants_owner_only() {
        let acl = CannedAcl::Private.expand(&synthetic_owner());
        assert_eq!(acl.grants.len(), 1);
        assert_eq!(acl.grants[0].permission, Permission::FullControl);
    }

    #[test]
    fn public_read_write_grants_three_entries() {
        let acl = CannedAcl::PublicReadWrite.expand(&synthetic_owner());
        assert_eq!(acl.grants.len(), 3);
    }

    #[test]
    fn parses_known_canned_names_only() {
        assert!(CannedAcl::parse("public-read").is_some());
        assert!(CannedAcl::parse("bogus").is_none());
    }
}
