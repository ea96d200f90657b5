use std::fmt::Debug;

use crate::model::common::role::Role;

/// A minimum role required to use an endpoint.
pub trait Access: Debug + Send + Sync + 'static {
    /// Lowest [`Role::rank`] allowed through.
    const RANK: u8;
    const NAME: &'static str;

    fn permits(role: Role) -> bool {
        role.rank() >= Self::RANK
    }
}

/// Any signed-in user.
#[derive(Debug)]
pub struct Member;

impl Access for Member {
    const RANK: u8 = 0;
    const NAME: &'static str = "member";
}

/// Surveyors and admins.
#[derive(Debug)]
pub struct Surveyor;

impl Access for Surveyor {
    const RANK: u8 = 1;
    const NAME: &'static str = "surveyor";
}

/// Admins only.
#[derive(Debug)]
pub struct Admin;

impl Access for Admin {
    const RANK: u8 = 2;
    const NAME: &'static str = "admin";
}
