//! Datagram (non-privileged) ICMP and ICMPv6 echo sockets

#[cfg(target_os = "linux")]
use super::errqueue::{self, Drained};
use super::{IpVersion, ProbeError, ProbeInfo, ProbeResponse, ProbeSocket, ResponseType};
use crate::checksum::internet_checksum;
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::icmpv6::{Icmpv6Packet, Icmpv6Types};
use pnet::packet::ipv4::Ipv4Packet;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::ErrorKind;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

/// Total size of an echo request, header included
pub const ECHO_PACKET_SIZE: usize = 64;
/// ICMP header length in bytes
const ICMP_HEADER_LEN_BYTES: usize = 8;
/// IPv4 header minimum length in bytes
const IPV4_HEADER_MIN_LEN_BYTES: usize = 20;
/// IPv6 fixed header length in bytes
const IPV6_HEADER_LEN_BYTES: usize = 40;
/// Receive buffer size
const RECV_BUFFER_SIZE: usize = 1500;

pub(super) const ICMPV4_ECHO_REQUEST: u8 = 8;
pub(super) const ICMPV6_ECHO_REQUEST: u8 = 128;

/// Build an echo request of [`ECHO_PACKET_SIZE`] bytes.
///
/// The ICMPv4 checksum is filled in. The ICMPv6 checksum covers a
/// pseudo-header only the kernel knows, so it is left zero.
pub fn build_echo_request(version: IpVersion, identifier: u16, sequence: u16) -> Vec<u8> {
    let mut packet = vec![0u8; ECHO_PACKET_SIZE];
    packet[0] = match version {
        IpVersion::V4 => ICMPV4_ECHO_REQUEST,
        IpVersion::V6 => ICMPV6_ECHO_REQUEST,
    };
    packet[4..6].copy_from_slice(&identifier.to_be_bytes());
    packet[6..8].copy_from_slice(&sequence.to_be_bytes());
    for (i, byte) in packet[ICMP_HEADER_LEN_BYTES..].iter_mut().enumerate() {
        *byte = i as u8;
    }

    if version == IpVersion::V4 {
        let checksum = internet_checksum(&packet);
        packet[2..4].copy_from_slice(&checksum.to_be_bytes());
    }
    packet
}

/// Match a received datagram against the probe that was sent.
///
/// Echo replies must come from the probed address and carry the probe's
/// sequence. Time Exceeded and Destination Unreachable must quote an echo
/// request with the probe's sequence. The identifier is not compared: Linux
/// rewrites it to the datagram socket's local port.
pub fn parse_reply(
    data: &[u8],
    version: IpVersion,
    from_addr: IpAddr,
    probe: &ProbeInfo,
) -> Option<ResponseType> {
    match version {
        IpVersion::V4 => parse_reply_v4(strip_ipv4_header(data)?, from_addr, probe),
        IpVersion::V6 => parse_reply_v6(data, from_addr, probe),
    }
}

/// macOS delivers the IP header on datagram ICMP sockets, Linux does not.
fn strip_ipv4_header(data: &[u8]) -> Option<&[u8]> {
    if data.len() >= IPV4_HEADER_MIN_LEN_BYTES && data[0] >> 4 == 4 {
        let header_len = usize::from(data[0] & 0x0f) * 4;
        data.get(header_len..)
    } else {
        Some(data)
    }
}

pub(super) fn sequence_at(icmp: &[u8]) -> Option<u16> {
    let bytes = icmp.get(6..8)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn parse_reply_v4(icmp_data: &[u8], from_addr: IpAddr, probe: &ProbeInfo) -> Option<ResponseType> {
    let icmp_packet = IcmpPacket::new(icmp_data)?;

    match icmp_packet.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let matches = sequence_at(icmp_data)? == probe.sequence && from_addr == probe.target;
            matches.then_some(ResponseType::EchoReply)
        }
        IcmpTypes::TimeExceeded | IcmpTypes::DestinationUnreachable => {
            let quoted = icmp_data.get(ICMP_HEADER_LEN_BYTES..)?;
            let inner = Ipv4Packet::new(quoted)?;
            let inner_header_len = usize::from(inner.get_header_length()) * 4;
            let original = quoted.get(inner_header_len..)?;

            if original.first() != Some(&ICMPV4_ECHO_REQUEST)
                || sequence_at(original)? != probe.sequence
            {
                return None;
            }
            if icmp_packet.get_icmp_type() == IcmpTypes::TimeExceeded {
                Some(ResponseType::TimeExceeded)
            } else {
                Some(ResponseType::DestinationUnreachable(
                    icmp_packet.get_icmp_code().0,
                ))
            }
        }
        _ => None,
    }
}

fn parse_reply_v6(icmp_data: &[u8], from_addr: IpAddr, probe: &ProbeInfo) -> Option<ResponseType> {
    let icmp_packet = Icmpv6Packet::new(icmp_data)?;

    match icmp_packet.get_icmpv6_type() {
        Icmpv6Types::EchoReply => {
            let matches = sequence_at(icmp_data)? == probe.sequence && from_addr == probe.target;
            matches.then_some(ResponseType::EchoReply)
        }
        Icmpv6Types::TimeExceeded | Icmpv6Types::DestinationUnreachable => {
            let original = icmp_data.get(ICMP_HEADER_LEN_BYTES + IPV6_HEADER_LEN_BYTES..)?;
            if original.first() != Some(&ICMPV6_ECHO_REQUEST)
                || sequence_at(original)? != probe.sequence
            {
                return None;
            }
            if icmp_packet.get_icmpv6_type() == Icmpv6Types::TimeExceeded {
                Some(ResponseType::TimeExceeded)
            } else {
                Some(ResponseType::DestinationUnreachable(
                    icmp_packet.get_icmpv6_code().0,
                ))
            }
        }
        _ => None,
    }
}

/// Datagram ICMP socket for either address family
pub struct DgramIcmpSocket {
    socket: Socket,
    version: IpVersion,
    icmp_identifier: u16,
}

impl DgramIcmpSocket {
    /// Open an unprivileged ICMP (IPv4) or ICMPv6 (IPv6) datagram socket
    pub fn new(version: IpVersion) -> Result<Self, ProbeError> {
        let (domain, protocol, bind_addr) = match version {
            IpVersion::V4 => (
                Domain::IPV4,
                Protocol::ICMPV4,
                SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            ),
            IpVersion::V6 => (
                Domain::IPV6,
                Protocol::ICMPV6,
                SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
            ),
        };

        let socket =
            Socket::new(domain, Type::DGRAM, Some(protocol)).map_err(ProbeError::Socket)?;
        socket
            .bind(&bind_addr.into())
            .map_err(ProbeError::Socket)?;

        #[cfg(target_os = "linux")]
        errqueue::enable(&socket, version).map_err(|source| ProbeError::SetOption {
            option: match version {
                IpVersion::V4 => "IP_RECVERR",
                IpVersion::V6 => "IPV6_RECVERR",
            },
            source,
        })?;

        Ok(Self {
            socket,
            version,
            icmp_identifier: std::process::id() as u16,
        })
    }
}

impl ProbeSocket for DgramIcmpSocket {
    fn ip_version(&self) -> IpVersion {
        self.version
    }

    fn set_ttl(&self, ttl: u8) -> Result<(), ProbeError> {
        match self.version {
            IpVersion::V4 => self
                .socket
                .set_ttl_v4(u32::from(ttl))
                .map_err(|source| ProbeError::SetOption {
                    option: "IP_TTL",
                    source,
                }),
            IpVersion::V6 => self
                .socket
                .set_unicast_hops_v6(u32::from(ttl))
                .map_err(|source| ProbeError::SetOption {
                    option: "IPV6_UNICAST_HOPS",
                    source,
                }),
        }
    }

    fn send_probe(&self, target: IpAddr, sequence: u16) -> Result<ProbeInfo, ProbeError> {
        if IpVersion::of(target) != self.version {
            return Err(ProbeError::AddressFamilyMismatch {
                target,
                socket: self.version,
            });
        }

        let packet = build_echo_request(self.version, self.icmp_identifier, sequence);
        let target_addr = SocketAddr::new(target, 0);
        self.socket
            .send_to(&packet, &target_addr.into())
            .map_err(ProbeError::Send)?;

        Ok(ProbeInfo {
            target,
            sequence,
            sent_at: Instant::now(),
        })
    }

    fn recv_response(
        &self,
        probe: &ProbeInfo,
        timeout: Duration,
    ) -> Result<Option<ProbeResponse>, ProbeError> {
        let mut recv_buf = [MaybeUninit::<u8>::uninit(); RECV_BUFFER_SIZE];
        let deadline = probe.sent_at + timeout;

        loop {
            #[cfg(target_os = "linux")]
            if let Some(response) = self.check_error_queue(probe)? {
                return Ok(Some(response));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            self.socket
                .set_read_timeout(Some(remaining))
                .map_err(|source| ProbeError::SetOption {
                    option: "SO_RCVTIMEO",
                    source,
                })?;

            match self.socket.recv_from(&mut recv_buf) {
                Ok((0, _)) => continue,
                Ok((size, socket_addr)) => {
                    let recv_time = Instant::now();
                    let Some(from_addr) = socket_addr.as_socket().map(|s| s.ip()) else {
                        continue;
                    };

                    let initialized_part: &[MaybeUninit<u8>] = &recv_buf[..size];
                    // SAFETY: recv_from initialized the first `size` bytes.
                    let packet_data: &[u8] =
                        unsafe { &*(initialized_part as *const [MaybeUninit<u8>] as *const [u8]) };

                    match parse_reply(packet_data, self.version, from_addr, probe) {
                        Some(response_type) => {
                            return Ok(Some(ProbeResponse {
                                from_addr,
                                response_type,
                                sequence: probe.sequence,
                                rtt: recv_time.duration_since(probe.sent_at),
                            }));
                        }
                        None => {
                            tracing::trace!(%from_addr, size, "ignoring unrelated ICMP datagram");
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    if let Some(response) = self.after_receive_error(probe, e)? {
                        return Ok(Some(response));
                    }
                }
            }
        }
    }
}

#[cfg(target_os = "linux")]
impl DgramIcmpSocket {
    /// Response for `probe` waiting in the error queue, if any
    fn check_error_queue(&self, probe: &ProbeInfo) -> Result<Option<ProbeResponse>, ProbeError> {
        match errqueue::drain(&self.socket, self.version, probe).map_err(ProbeError::Receive)? {
            Drained::Matched(from_addr, response_type) => {
                Ok(Some(queued_response(probe, from_addr, response_type)))
            }
            Drained::Stale | Drained::Empty => Ok(None),
        }
    }

    /// A queued ICMP error wakes `recv_from` with its errno. Such errors
    /// are answered from the error queue; anything else is a real failure.
    fn after_receive_error(
        &self,
        probe: &ProbeInfo,
        error: std::io::Error,
    ) -> Result<Option<ProbeResponse>, ProbeError> {
        match errqueue::drain(&self.socket, self.version, probe).map_err(ProbeError::Receive)? {
            Drained::Matched(from_addr, response_type) => {
                Ok(Some(queued_response(probe, from_addr, response_type)))
            }
            Drained::Stale => {
                tracing::trace!(%error, "receive woken by unrelated ICMP error");
                Ok(None)
            }
            Drained::Empty => Err(ProbeError::Receive(error)),
        }
    }
}

#[cfg(target_os = "linux")]
fn queued_response(probe: &ProbeInfo, from_addr: IpAddr, response_type: ResponseType) -> ProbeResponse {
    ProbeResponse {
        from_addr,
        response_type,
        sequence: probe.sequence,
        rtt: probe.sent_at.elapsed(),
    }
}

#[cfg(not(target_os = "linux"))]
impl DgramIcmpSocket {
    fn after_receive_error(
        &self,
        _probe: &ProbeInfo,
        error: std::io::Error,
    ) -> Result<Option<ProbeResponse>, ProbeError> {
        Err(ProbeError::Receive(error))
    }
}
