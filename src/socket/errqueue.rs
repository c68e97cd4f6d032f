//! Linux socket error queue for datagram ICMP sockets
//!
//! Linux hands Time Exceeded and Destination Unreachable for ping sockets
//! only to the error queue, and only once `IP_RECVERR` / `IPV6_RECVERR` is
//! enabled. Each queue entry carries a `sock_extended_err`, the offending
//! router's address and the quoted echo request.

use super::icmp::{sequence_at, ICMPV4_ECHO_REQUEST, ICMPV6_ECHO_REQUEST};
use super::{IpVersion, ProbeInfo, ResponseType};
use socket2::Socket;
use std::io;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::os::fd::AsRawFd;
use std::ptr;

const SO_EE_ORIGIN_ICMP: u8 = 2;
const SO_EE_ORIGIN_ICMP6: u8 = 3;

const ICMPV4_DEST_UNREACHABLE: u8 = 3;
const ICMPV4_TIME_EXCEEDED: u8 = 11;
const ICMPV6_DEST_UNREACHABLE: u8 = 1;
const ICMPV6_TIME_EXCEEDED: u8 = 3;

/// Quoted datagram bytes kept from one queue entry
const QUOTE_BUFFER_SIZE: usize = 576;

// sock_extended_err from <linux/errqueue.h>
#[allow(dead_code)]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct SockExtendedErr {
    ee_errno: u32,
    ee_origin: u8,
    ee_type: u8,
    ee_code: u8,
    ee_pad: u8,
    ee_info: u32,
    ee_data: u32,
}

/// Outcome of draining the error queue
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Drained {
    /// An entry answered the probe
    Matched(IpAddr, ResponseType),
    /// Entries were read but none answered the probe
    Stale,
    /// The queue was empty
    Empty,
}

/// One entry read off the error queue
struct QueuedError {
    err: SockExtendedErr,
    offender: Option<IpAddr>,
    quoted: Vec<u8>,
}

/// Ask the kernel to queue ICMP errors for this socket
pub(super) fn enable(socket: &Socket, version: IpVersion) -> io::Result<()> {
    let (level, name) = match version {
        IpVersion::V4 => (libc::IPPROTO_IP, libc::IP_RECVERR),
        IpVersion::V6 => (libc::IPPROTO_IPV6, libc::IPV6_RECVERR),
    };
    let enable: libc::c_int = 1;
    // SAFETY: the fd is open and the option value is a c_int of the given size.
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            name,
            ptr::addr_of!(enable).cast::<libc::c_void>(),
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Read every pending entry without blocking, returning the first that
/// answers `probe`.
pub(super) fn drain(socket: &Socket, version: IpVersion, probe: &ProbeInfo) -> io::Result<Drained> {
    let mut outcome = Drained::Empty;
    while let Some(entry) = recv_queued(socket)? {
        let Some(offender) = entry.offender else {
            outcome = Drained::Stale;
            continue;
        };
        match classify(
            version,
            entry.err.ee_origin,
            entry.err.ee_type,
            entry.err.ee_code,
            &entry.quoted,
            probe,
        ) {
            Some(response_type) => return Ok(Drained::Matched(offender, response_type)),
            None => {
                tracing::trace!(%offender, ee_type = entry.err.ee_type, "ignoring stale queued ICMP error");
                outcome = Drained::Stale;
            }
        }
    }
    Ok(outcome)
}

/// Map a queued ICMP error onto a response for `probe`.
///
/// The quoted bytes start at the echo request the kernel sent, so they go
/// through the same sequence check as a received reply.
pub(super) fn classify(
    version: IpVersion,
    origin: u8,
    icmp_type: u8,
    icmp_code: u8,
    quoted: &[u8],
    probe: &ProbeInfo,
) -> Option<ResponseType> {
    let (expected_origin, echo_request, time_exceeded, unreachable) = match version {
        IpVersion::V4 => (
            SO_EE_ORIGIN_ICMP,
            ICMPV4_ECHO_REQUEST,
            ICMPV4_TIME_EXCEEDED,
            ICMPV4_DEST_UNREACHABLE,
        ),
        IpVersion::V6 => (
            SO_EE_ORIGIN_ICMP6,
            ICMPV6_ECHO_REQUEST,
            ICMPV6_TIME_EXCEEDED,
            ICMPV6_DEST_UNREACHABLE,
        ),
    };

    if origin != expected_origin
        || quoted.first() != Some(&echo_request)
        || sequence_at(quoted)? != probe.sequence
    {
        return None;
    }

    if icmp_type == time_exceeded {
        Some(ResponseType::TimeExceeded)
    } else if icmp_type == unreachable {
        Some(ResponseType::DestinationUnreachable(icmp_code))
    } else {
        None
    }
}

fn recv_queued(socket: &Socket) -> io::Result<Option<QueuedError>> {
    let mut quoted = [0u8; QUOTE_BUFFER_SIZE];
    // u64 elements keep the control buffer aligned for cmsghdr
    let mut control = [0u64; 64];
    let mut iov = libc::iovec {
        iov_base: quoted.as_mut_ptr().cast::<libc::c_void>(),
        iov_len: quoted.len(),
    };

    // SAFETY: msghdr is plain old data; all-zero is an empty header.
    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = ptr::addr_of_mut!(iov);
    msg.msg_iovlen = 1;
    msg.msg_control = control.as_mut_ptr().cast::<libc::c_void>();
    msg.msg_controllen = mem::size_of_val(&control) as _;

    // SAFETY: msg points at live buffers whose lengths are set above.
    let ret = unsafe {
        libc::recvmsg(
            socket.as_raw_fd(),
            &mut msg,
            libc::MSG_ERRQUEUE | libc::MSG_DONTWAIT,
        )
    };
    if ret < 0 {
        let err = io::Error::last_os_error();
        return match err.kind() {
            io::ErrorKind::WouldBlock => Ok(None),
            io::ErrorKind::Interrupted => recv_queued(socket),
            _ => Err(err),
        };
    }
    let quoted_len = usize::try_from(ret).unwrap_or(0).min(quoted.len());

    // SAFETY: the CMSG_* helpers only walk the control buffer the kernel
    // filled, and every read is bounded by the entry's cmsg_len.
    let (err, offender) = unsafe {
        let mut found = None;
        let mut cmsg = libc::CMSG_FIRSTHDR(&msg);
        while !cmsg.is_null() {
            let header = ptr::read_unaligned(cmsg);
            let is_recverr = (header.cmsg_level == libc::IPPROTO_IP
                && header.cmsg_type == libc::IP_RECVERR)
                || (header.cmsg_level == libc::IPPROTO_IPV6
                    && header.cmsg_type == libc::IPV6_RECVERR);

            let data_len = (header.cmsg_len as usize).saturating_sub(libc::CMSG_LEN(0) as usize);
            if is_recverr && data_len >= mem::size_of::<SockExtendedErr>() {
                let err_ptr = libc::CMSG_DATA(cmsg).cast::<SockExtendedErr>();
                let err = ptr::read_unaligned(err_ptr);
                let offender_ptr = err_ptr.cast::<u8>().add(mem::size_of::<SockExtendedErr>());
                let offender_len = data_len - mem::size_of::<SockExtendedErr>();
                found = Some((err, read_offender(offender_ptr, offender_len)));
                break;
            }
            cmsg = libc::CMSG_NXTHDR(&msg, cmsg);
        }
        match found {
            Some(found) => found,
            None => return Ok(Some(QueuedError::unrecognized())),
        }
    };

    Ok(Some(QueuedError {
        err,
        offender,
        quoted: quoted[..quoted_len].to_vec(),
    }))
}

impl QueuedError {
    /// Entry without an extended error, kept only so draining moves on
    fn unrecognized() -> Self {
        Self {
            err: SockExtendedErr {
                ee_errno: 0,
                ee_origin: 0,
                ee_type: 0,
                ee_code: 0,
                ee_pad: 0,
                ee_info: 0,
                ee_data: 0,
            },
            offender: None,
            quoted: Vec::new(),
        }
    }
}

/// Offender sockaddr that follows the extended error (SO_EE_OFFENDER)
///
/// # Safety
///
/// `ptr` must be valid for reads of `len` bytes.
unsafe fn read_offender(ptr: *const u8, len: usize) -> Option<IpAddr> {
    if len < mem::size_of::<libc::sa_family_t>() {
        return None;
    }
    let family = ptr::read_unaligned(ptr.cast::<libc::sa_family_t>());
    match libc::c_int::from(family) {
        libc::AF_INET if len >= mem::size_of::<libc::sockaddr_in>() => {
            let sin = ptr::read_unaligned(ptr.cast::<libc::sockaddr_in>());
            Some(IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))))
        }
        libc::AF_INET6 if len >= mem::size_of::<libc::sockaddr_in6>() => {
            let sin6 = ptr::read_unaligned(ptr.cast::<libc::sockaddr_in6>());
            Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
        }
        _ => None,
    }
}
